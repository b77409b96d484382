use std::io::{BufRead, Write};

use anyhow::{Context, Error};
use serde::Serialize;
use slicecap_core::{
    analysis::{SliceStats, SpectrumAnalyzer, SpectrumPeak},
    codec::parse_line,
};
use tracing::{debug, info};

use crate::settings::AppSettings;

/// Reads slice lines from stdin and prints one JSON summary per line
#[derive(clap::Args, Debug, Clone, Default)]
pub struct InspectArgs {
    /// Rate the lines were captured at; defaults to the configured rate
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Skip the FFT peak search
    #[arg(long)]
    pub no_spectrum: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LineSummary {
    line: usize,
    #[serde(flatten)]
    stats: SliceStats,
    peak_dbfs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    spectrum_peak: Option<SpectrumPeak>,
}

pub async fn main(args: InspectArgs, settings: AppSettings) -> Result<(), Error> {
    let sample_rate = args.sample_rate.unwrap_or(settings.sample_rate);
    let spectrum = !args.no_spectrum;
    let lines = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        summarize(stdin.lock(), stdout.lock(), sample_rate, spectrum)
    })
    .await??;
    info!(lines, sample_rate, "inspect finished");
    Ok(())
}

/// Returns the number of non-blank lines summarised.
fn summarize<R: BufRead, W: Write>(
    input: R,
    mut out: W,
    sample_rate: u32,
    spectrum: bool,
) -> Result<usize, Error> {
    let mut analyzer: Option<SpectrumAnalyzer> = None;
    let mut summarised = 0;

    for (idx, line) in input.lines().enumerate() {
        let line = line.context("failed to read input")?;
        let samples = parse_line(&line).with_context(|| format!("line {}", idx + 1))?;
        let Some(stats) = SliceStats::from_samples(&samples) else {
            continue;
        };

        let spectrum_peak = if spectrum {
            let analyzer = match analyzer.take() {
                Some(a) if a.len() == samples.len() => analyzer.insert(a),
                _ => {
                    debug!(len = samples.len(), "planning fft");
                    analyzer.insert(SpectrumAnalyzer::new(samples.len()))
                }
            };
            analyzer.peak(&samples, sample_rate)
        } else {
            None
        };

        let summary = LineSummary {
            line: idx + 1,
            stats,
            peak_dbfs: stats.peak_dbfs(),
            spectrum_peak,
        };
        serde_json::to_writer(&mut out, &summary)?;
        out.write_all(b"\n")?;
        summarised += 1;
    }
    out.flush()?;
    Ok(summarised)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicecap_core::SlicecapError;

    fn run(input: &str, spectrum: bool) -> Result<(usize, Vec<serde_json::Value>), Error> {
        let mut out = Vec::new();
        let n = summarize(input.as_bytes(), &mut out, 8, spectrum)?;
        let values = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        Ok((n, values))
    }

    #[test]
    fn summarises_each_line() {
        let (n, values) = run("1,3,5,7\n\n-2,2\n", false).unwrap();
        assert_eq!(n, 2);
        assert_eq!(values[0]["line"], 1);
        assert_eq!(values[0]["count"], 4);
        assert_eq!(values[0]["min"], 1);
        assert_eq!(values[0]["max"], 7);
        assert_eq!(values[0]["mean"], 4.0);
        assert_eq!(values[1]["line"], 3);
        assert_eq!(values[1]["rms"], 2.0);
        assert!(values[0].get("spectrumPeak").is_none());
    }

    #[test]
    fn reports_spectrum_peak() {
        // Two cycles over eight samples at 8 Hz: 2 Hz tone.
        let tone = "0,1000,0,-1000,0,1000,0,-1000\n";
        let (_, values) = run(tone, true).unwrap();
        let hz = values[0]["spectrumPeak"]["frequencyHz"].as_f64().unwrap();
        assert!((hz - 2.0).abs() < 1e-6, "{hz}");
    }

    #[test]
    fn malformed_line_names_line_number() {
        let err = run("1,2\n3,x\n", false).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "{err:#}");
        assert!(matches!(
            err.downcast_ref::<SlicecapError>(),
            Some(SlicecapError::MalformedLine { .. })
        ));
    }
}
