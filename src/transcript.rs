use crate::metadata::{FrameSample, Transcript, TranscriptSegment};

/// 找到覆盖给定时间戳的第一个转写片段
///
/// 区间两端闭合（start <= t <= end）。片段重叠时按输入顺序取最早的
/// 一个——这是策略选择而不是正确性要求，规范的转写不应该重叠。
/// 无匹配是正常结果，不是错误。
pub fn align_timestamp(timestamp: f64, segments: &[TranscriptSegment]) -> Option<&TranscriptSegment> {
    segments
        .iter()
        .find(|segment| segment.start <= timestamp && timestamp <= segment.end)
}

/// 为每个采样帧附加对齐的语音文本（创建后唯一允许的修改）
pub fn attach_spoken_text(samples: &mut [FrameSample], transcript: &Transcript) {
    for sample in samples.iter_mut() {
        sample.spoken_text = align_timestamp(sample.timestamp, &transcript.segments)
            .map(|segment| segment.text.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_align_inside_segment() {
        let segments = vec![segment(1.0, 2.5, "hello")];
        assert_eq!(align_timestamp(2.0, &segments).unwrap().text, "hello");
        assert!(align_timestamp(2.6, &segments).is_none());
        assert!(align_timestamp(0.5, &segments).is_none());
    }

    #[test]
    fn test_align_boundaries_are_inclusive() {
        let segments = vec![segment(1.0, 2.5, "hello")];
        assert!(align_timestamp(1.0, &segments).is_some());
        assert!(align_timestamp(2.5, &segments).is_some());
    }

    #[test]
    fn test_overlap_resolves_to_first_in_input_order() {
        // 重叠是退化输入：取输入顺序中最早的片段
        let segments = vec![segment(0.0, 5.0, "first"), segment(3.0, 8.0, "second")];
        assert_eq!(align_timestamp(4.0, &segments).unwrap().text, "first");
        assert_eq!(align_timestamp(6.0, &segments).unwrap().text, "second");
    }

    #[test]
    fn test_align_empty_segments() {
        assert!(align_timestamp(1.0, &[]).is_none());
    }

    #[test]
    fn test_attach_spoken_text_trims() {
        let transcript = Transcript {
            text: " hello world".to_string(),
            segments: vec![segment(0.0, 1.5, " hello world ")],
        };
        let mut samples = vec![sample_at(0, 1.0), sample_at(1, 2.0)];
        attach_spoken_text(&mut samples, &transcript);
        assert_eq!(samples[0].spoken_text.as_deref(), Some("hello world"));
        assert!(samples[1].spoken_text.is_none());
    }

    fn sample_at(index: usize, timestamp: f64) -> FrameSample {
        use crate::metadata::ComplexityClass;
        FrameSample {
            index,
            timestamp,
            resolution: "8x8".to_string(),
            brightness: 128.0,
            contrast: 10.0,
            dominant_color: [128.0, 128.0, 128.0],
            edge_density: 0.01,
            complexity: ComplexityClass::Low,
            description: "medium lighting, low contrast, simple scene".to_string(),
            frame_file: format!("{:04}_{:.2}s.jpg", index, timestamp),
            spoken_text: None,
        }
    }
}
