//! Integration tests for fragment records on disk.

use proptest::prelude::*;
use tempfile::TempDir;
use tessera_core::path::{signal_file_name, TimelinePath};
use tessera_core::{AudioFormat, NumberValue, PcmBuffer, PcmFormat, SampleData, SampleType, TimeRange};
use tessera_record::{
    numbers_file, signal_file, FragmentContent, FragmentExporter, SignalFileInfo, SignalReadError,
};

// =============================================================================
// File name codec
// =============================================================================

fn sample_type_strategy() -> impl Strategy<Value = SampleType> {
    prop::sample::select(SampleType::ALL.to_vec())
}

proptest! {
    #[test]
    fn test_signal_name_round_trip(
        frame in any::<i64>(),
        length in 0..=i64::MAX as u64,
        sample_type in sample_type_strategy(),
    ) {
        prop_assume!(frame.checked_add(length as i64).is_some());
        let range = TimeRange::new(frame, length);
        let info = SignalFileInfo::from_path(signal_file_name(range, sample_type)).unwrap();
        prop_assert_eq!(info.range, range);
        prop_assert_eq!(info.sample_type, sample_type);
    }

    #[test]
    fn test_arbitrary_names_never_panic(name in "[a-z0-9_\\-]{0,24}") {
        let _ = SignalFileInfo::from_path(&name);
    }
}

#[test]
fn test_unrepresentable_ranges_are_rejected() {
    for name in [
        "signal_0_9223372036854775808_f32",
        "signal_0_18446744073709551615_i16",
        "signal_9223372036854775800_16_f32",
        "signal_1_9223372036854775807_f64",
    ] {
        assert!(SignalFileInfo::from_path(name).is_none(), "{name}");
    }
    let info = SignalFileInfo::from_path("signal_9223372036854775800_7_f32").unwrap();
    assert_eq!(info.range.length, 7);
}

#[test]
fn test_oversized_record_reads_out_of_range() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("signal_0_4_f32");
    signal_file::write(&path, &SampleData::Float32(vec![1.0; 4])).unwrap();
    let format = AudioFormat::mono(4, PcmFormat::Float32);

    for range in [
        TimeRange::new(0, u64::MAX),
        TimeRange::new(i64::MAX - 2, 4),
    ] {
        let info = SignalFileInfo {
            path: path.clone(),
            range,
            sample_type: SampleType::Float32,
        };
        let mut buffer = PcmBuffer::new(format, 4);
        let result = signal_file::read(&info, &mut buffer, 0);
        assert!(
            matches!(result, Err(SignalReadError::OutOfRange { .. })),
            "{range:?}: {result:?}"
        );
    }

    let info = SignalFileInfo {
        path,
        range: TimeRange::new(0, u64::MAX),
        sample_type: SampleType::Float32,
    };
    assert!(matches!(
        signal_file::read_bytes(&info),
        Err(SignalReadError::OutOfRange { .. })
    ));
}

// =============================================================================
// Exported fragments read back into a buffer
// =============================================================================

#[test]
fn test_exported_fragment_fills_buffer() {
    let dir = TempDir::new().unwrap();
    let timeline = TimelinePath::new(dir.path(), "song", 8);
    let exporter = FragmentExporter::new(timeline.clone());

    let mut content = FragmentContent::new();
    content
        .entry(0)
        .or_default()
        .push_signal(8, SampleData::Int16(vec![1, 2, 3]))
        .push_signal(13, SampleData::Int16(vec![9, 9, 9]))
        .push_number(8, NumberValue::Int32(5));
    exporter.export_fragment(1, &content).unwrap();

    let fragment_dir = timeline.channel(0).fragment(1).value();
    let mut infos: Vec<SignalFileInfo> = std::fs::read_dir(&fragment_dir)
        .unwrap()
        .filter_map(|e| SignalFileInfo::from_path(e.unwrap().path()))
        .collect();
    infos.sort_by_key(|info| info.range.frame);
    assert_eq!(infos.len(), 2);

    let mut buffer = PcmBuffer::new(AudioFormat::mono(8, PcmFormat::Int16), 8);
    for info in &infos {
        signal_file::read(info, &mut buffer, 8).unwrap();
    }

    assert_eq!(
        buffer.channel(0),
        Some(&SampleData::Int16(vec![1, 2, 3, 0, 0, 9, 9, 9]))
    );
    assert_eq!(
        numbers_file::read(timeline.channel(0).fragment(1).numbers().value()).unwrap(),
        vec![(8, NumberValue::Int32(5))]
    );
}
