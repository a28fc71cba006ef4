//! Runs through the on-disk image-sequence collaborators and CSV loader.

use std::fs;

use vidmark::annotations::{load_labels, AnnotationIndex};
use vidmark::capture::{open_source, Frame, FrameSource, ImageSequenceSource, PixelFormat};
use vidmark::output::{open_sink, FrameSink, ImageSequenceSink};
use vidmark::pipeline::SyncPipeline;
use vidmark::{Config, FrameRenderer, OutputConfig};

const LABELS: &str = "\
videoName,frameIndex,category,box2d.x1,box2d.y1,box2d.x2,box2d.y2
clip,0,car,4,4,20,20
clip,1,pedestrian,8,8,24,24
other,0,bus,0,0,5,5
";

fn write_input_frames(dir: &std::path::Path, n: u64, width: u32, height: u32) {
    let mut sink = ImageSequenceSink::create(dir, width, height).unwrap();
    for i in 0..n {
        sink.write(Frame::solid(i, width, height, PixelFormat::Rgb24, [40, 40, 40]))
            .unwrap();
    }
    sink.finish().unwrap();
}

#[test]
fn sequence_sink_and_source_agree_on_order_and_pixels() {
    let dir = tempfile::tempdir().unwrap();
    write_input_frames(dir.path(), 3, 8, 6);

    let names: Vec<_> = {
        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    };
    assert_eq!(names, ["frame_000000.png", "frame_000001.png", "frame_000002.png"]);

    let mut source = ImageSequenceSource::open(dir.path(), 24.0, None).unwrap();
    assert_eq!(source.info().frame_count, Some(3));
    assert_eq!((source.info().width, source.info().height), (8, 6));

    let mut count = 0;
    while let Some(frame) = source.next_frame().unwrap() {
        assert_eq!(frame.sequence(), count);
        assert_eq!(frame.pixel_bgr(7, 5), Some([40, 40, 40]));
        count += 1;
    }
    assert_eq!(count, 3);
}

#[test]
fn sequence_source_rescales_to_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    write_input_frames(dir.path(), 1, 8, 6);

    let mut source = ImageSequenceSource::open(dir.path(), 24.0, Some((16, 12))).unwrap();
    let frame = source.next_frame().unwrap().unwrap();
    assert_eq!((frame.width(), frame.height()), (16, 12));
}

#[test]
fn full_run_from_csv_and_stills() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("input");
    let output = work.path().join("output");
    let labels = work.path().join("labels.csv");
    fs::write(&labels, LABELS).unwrap();

    let mut config = Config::default();
    config.annotations.video_name = "clip".to_string();
    config.annotations.rate_ratio = Some(5.0);
    config.output = OutputConfig {
        width: 32,
        height: 32,
        ..OutputConfig::default()
    };
    write_input_frames(&input, 8, 32, 32);

    let loaded = load_labels(&labels, &config.annotations.video_name).unwrap();
    assert_eq!(loaded.records.len(), 2);
    let index =
        AnnotationIndex::build_with(loaded.records, config.annotations.rate_conversion().unwrap());
    assert_eq!(index.keys(), &[0, 5]);

    let source = open_source(&input, config.input.sequence_fps, Some((32, 32))).unwrap();
    let sink = open_sink(&output, &config.output).unwrap();
    let report = SyncPipeline::new(&index, FrameRenderer::from_config(&config.render))
        .run(source, sink)
        .unwrap();
    assert_eq!(report.frames_written, 8);
    assert_eq!(report.annotated_frames, 8);

    let mut rendered = ImageSequenceSource::open(&output, 24.0, None).unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = rendered.next_frame().unwrap() {
        frames.push(frame);
    }
    assert_eq!(frames.len(), 8);
    // car (red) held on 0..5, pedestrian (blue) from 5 on
    assert_eq!(frames[4].pixel_bgr(4, 4), Some([0, 0, 255]));
    assert_eq!(frames[4].pixel_bgr(8, 8), Some([40, 40, 40]));
    assert_eq!(frames[5].pixel_bgr(8, 8), Some([255, 0, 0]));
    assert_eq!(frames[7].pixel_bgr(8, 8), Some([255, 0, 0]));
}

#[test]
fn video_output_without_backend_reports_feature() {
    if cfg!(feature = "gstreamer-pipeline") {
        return;
    }
    let work = tempfile::tempdir().unwrap();
    let err = open_sink(&work.path().join("out.mp4"), &OutputConfig::default())
        .err()
        .unwrap();
    assert!(err.to_string().contains("gstreamer-pipeline"));
}
