use crate::metadata::{AggregateStats, ComplexityBucket, ComplexityClass, FrameSample};

/// 聚合器：对最终有序的采样序列做一次性汇总
///
/// 纯函数、单趟遍历。采样全部完成后才运行，不做流式 / 增量聚合。
pub struct Aggregator;

impl Aggregator {
    /// 计算均值和复杂度分布
    ///
    /// 空序列不做除法：均值为 None，三档分布保持零计数（"无数据"输出）。
    pub fn aggregate(samples: &[FrameSample]) -> AggregateStats {
        // 固定三档，零初始化，避免动态形状的分类状态
        let mut counts = [0usize; 3];
        let mut brightness_sum = 0.0;
        let mut contrast_sum = 0.0;
        let mut edge_density_sum = 0.0;

        for sample in samples {
            brightness_sum += sample.brightness;
            contrast_sum += sample.contrast;
            edge_density_sum += sample.edge_density;
            counts[class_slot(sample.complexity)] += 1;
        }

        let total = samples.len();
        let (mean_brightness, mean_contrast, mean_edge_density) = if total > 0 {
            let n = total as f64;
            (
                Some(brightness_sum / n),
                Some(contrast_sum / n),
                Some(edge_density_sum / n),
            )
        } else {
            (None, None, None)
        };

        let distribution = ComplexityClass::ALL
            .iter()
            .map(|&class| {
                let count = counts[class_slot(class)];
                let percentage = if total > 0 {
                    100.0 * count as f64 / total as f64
                } else {
                    0.0
                };
                ComplexityBucket {
                    class,
                    count,
                    percentage,
                }
            })
            .collect();

        AggregateStats {
            mean_brightness,
            mean_contrast,
            mean_edge_density,
            distribution,
        }
    }
}

fn class_slot(class: ComplexityClass) -> usize {
    match class {
        ComplexityClass::Low => 0,
        ComplexityClass::Medium => 1,
        ComplexityClass::High => 2,
    }
}
