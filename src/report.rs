//! Report Assembler: flattens the analyzer's terminal `PathResult`s into a
//! human-readable summary. No machine-readable output is produced; the
//! structured `Vec<PathResult>` itself is already available to callers for
//! that.

use crate::analyzer::PathResult;

pub fn render(results: &[PathResult]) -> String {
    let mut out = format!("{} differing path(s) found\n", results.len());
    for result in results {
        out.push_str(&format!(
            "  {path}: r = {r:.4}\n",
            path = result.path,
            r = result.effect_size
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanPath;
    use crate::stats::MannWhitneyResult;

    #[test]
    fn renders_count_and_one_line_per_path() {
        let results = vec![PathResult {
            path: SpanPath::root("root").child("A"),
            test_statistics: MannWhitneyResult {
                u_statistic: 0.0,
                common_language_effect_size: 0.0,
                rank_biserial_correlation: -0.42,
            },
            effect_size: -0.42,
        }];
        let rendered = render(&results);
        assert!(rendered.contains("1 differing path(s) found"));
        assert!(rendered.contains("root > A"));
        assert!(rendered.contains("-0.4200"));
    }

    #[test]
    fn renders_zero_count_for_empty_results() {
        assert!(render(&[]).contains("0 differing path(s) found"));
    }
}
