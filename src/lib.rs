pub mod aggregate;
pub mod audio_extractor;
pub mod config;
pub mod downloader;
pub mod error;
pub mod handler;
pub mod metadata;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod sampler;
pub mod transcriber;
pub mod transcript;
pub mod video_source;

pub use aggregate::Aggregator;
pub use audio_extractor::AudioExtractor;
pub use config::ConfigLoader;
pub use downloader::fetch_video;
pub use error::{AnalyzeError, AnalyzeResult};
pub use metadata::{
    AggregateStats, AnalysisResult, ComplexityBucket, ComplexityClass, FrameSample, Transcript,
    TranscriptSegment, VideoMeta,
};
pub use metrics::MetricExtractor;
pub use pipeline::{analyze_video, AnalyzeConfig, AnalyzeOutput};
pub use report::ReportRenderer;
pub use sampler::{FrameSampler, SampledFrame};
pub use transcriber::{JsonTranscriptFile, TranscriptProvider, WhisperCommandTranscriber};
pub use transcript::{align_timestamp, attach_spoken_text};
pub use video_source::{FrameSource, VideoSource};
