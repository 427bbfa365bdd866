//! tedana command-line builder.
//!
//! Translates an [`AcquisitionRow`] and a set of [`TedanaOptions`] into the
//! argument list of the `tedana` workflow entry point.

use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionRow;
use crate::error::CoreError;
use crate::types::EchoTimeSecs;

/// Executable name looked up on `PATH` when no explicit path is given.
pub const TEDANA_BIN: &str = "tedana";

// ---------------------------------------------------------------------------
// Option enums
// ---------------------------------------------------------------------------

/// T2*/S0 estimation method (`--fittype`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitType {
    /// Log-linear fit. Faster, slightly less accurate.
    Loglin,
    /// Monoexponential curve fit.
    #[default]
    Curvefit,
}

/// PCA component selection method (`--tedpca`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TedPca {
    /// Minimum Description Length. Most aggressive, fewest components.
    Mdl,
    /// Kullback-Leibler Information Criterion. Moderate.
    #[default]
    Kic,
    /// Akaike Information Criterion. Least aggressive.
    Aic,
}

/// Post-processing to remove spatially diffuse noise (`--gscontrol`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GsControl {
    /// Global signal regression.
    Gsr,
    /// Minimum image regression.
    Mir,
}

impl FitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loglin => "loglin",
            Self::Curvefit => "curvefit",
        }
    }
}

impl TedPca {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mdl => "mdl",
            Self::Kic => "kic",
            Self::Aic => "aic",
        }
    }
}

impl GsControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gsr => "gsr",
            Self::Mir => "mir",
        }
    }
}

macro_rules! str_enum_impls {
    ($ty:ty, $what:literal, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let valid: Vec<&str> = [$($variant),+].iter().map(|v| v.as_str()).collect();
                        CoreError::Validation(format!(
                            "unknown {} '{s}', expected one of: {}",
                            $what,
                            valid.join(", ")
                        ))
                    })
            }
        }
    };
}

str_enum_impls!(FitType, "fittype", [FitType::Loglin, FitType::Curvefit]);
str_enum_impls!(TedPca, "tedpca", [TedPca::Mdl, TedPca::Kic, TedPca::Aic]);
str_enum_impls!(GsControl, "gscontrol", [GsControl::Gsr, GsControl::Mir]);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Fixed workflow options applied to every acquisition of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TedanaOptions {
    pub fittype: FitType,
    pub tedpca: TedPca,
    /// Empty means no global signal control.
    pub gscontrol: Vec<GsControl>,
    pub verbose: bool,
    /// Threads per tedana process; tedana's own default when `None`.
    pub n_threads: Option<u32>,
    /// Let tedana overwrite existing outputs.
    pub overwrite: bool,
}

impl Default for TedanaOptions {
    fn default() -> Self {
        Self {
            fittype: FitType::Curvefit,
            tedpca: TedPca::Kic,
            gscontrol: Vec::new(),
            verbose: true,
            n_threads: None,
            overwrite: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Argument building
// ---------------------------------------------------------------------------

/// Format a BIDS echo time (seconds) as the millisecond value tedana's CLI
/// expects, without float noise.
///
/// ```
/// use mebatch_core::tedana::echo_time_ms_arg;
///
/// assert_eq!(echo_time_ms_arg(0.0145), "14.5");
/// assert_eq!(echo_time_ms_arg(0.03), "30");
/// ```
pub fn echo_time_ms_arg(seconds: EchoTimeSecs) -> String {
    let ms = (seconds * 1000.0 * 1e6).round() / 1e6;
    format!("{ms}")
}

/// Build the full tedana argument list for one acquisition.
pub fn build_tedana_args(row: &AcquisitionRow, options: &TedanaOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    args.push("-d".into());
    args.extend(row.echo_files.iter().map(|p| p.as_os_str().to_os_string()));

    args.push("-e".into());
    args.extend(row.echo_times.iter().map(|te| echo_time_ms_arg(*te).into()));

    args.push("--out-dir".into());
    args.push(row.out_dir.as_os_str().to_os_string());
    args.push("--prefix".into());
    args.push(row.prefix.clone().into());
    args.push("--fittype".into());
    args.push(options.fittype.as_str().into());
    args.push("--tedpca".into());
    args.push(options.tedpca.as_str().into());

    if !options.gscontrol.is_empty() {
        args.push("--gscontrol".into());
        args.extend(options.gscontrol.iter().map(|g| g.as_str().into()));
    }
    if let Some(n) = options.n_threads {
        args.push("--n-threads".into());
        args.push(n.to_string().into());
    }
    if options.verbose {
        args.push("--verbose".into());
    }
    if options.overwrite {
        args.push("--overwrite".into());
    }

    args
}

/// Render a command line for display (plan output, logs).
pub fn render_command(program: &str, args: &[OsString]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|a| {
            let s = a.to_string_lossy();
            if s.contains(char::is_whitespace) {
                format!("'{s}'")
            } else {
                s.into_owned()
            }
        }))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use assert_matches::assert_matches;

    use super::*;
    use crate::naming::parse_entities;

    fn row() -> AcquisitionRow {
        AcquisitionRow {
            acquisition: "sub-01_task-rest".to_string(),
            subject: "sub-01".to_string(),
            task: "task-rest".to_string(),
            entities: parse_entities("sub-01_task-rest").expect("entities"),
            echoes: vec![1, 2, 3],
            echo_files: (1..=3)
                .map(|e| PathBuf::from(format!("/prep/sub-01_task-rest_echo-{e}_desc-preproc_bold.nii.gz")))
                .collect(),
            echo_times: vec![0.0145, 0.0385, 0.0625],
            out_dir: PathBuf::from("/deriv/tedana/sub-01/task-rest"),
            prefix: "sub-01_task-rest_space-Native".to_string(),
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn default_options_match_batch_defaults() {
        let opts = TedanaOptions::default();
        assert_eq!(opts.fittype, FitType::Curvefit);
        assert_eq!(opts.tedpca, TedPca::Kic);
        assert!(opts.gscontrol.is_empty());
        assert!(opts.verbose);
    }

    #[test]
    fn args_with_defaults() {
        let args = strings(&build_tedana_args(&row(), &TedanaOptions::default()));
        assert_eq!(
            args,
            vec![
                "-d",
                "/prep/sub-01_task-rest_echo-1_desc-preproc_bold.nii.gz",
                "/prep/sub-01_task-rest_echo-2_desc-preproc_bold.nii.gz",
                "/prep/sub-01_task-rest_echo-3_desc-preproc_bold.nii.gz",
                "-e",
                "14.5",
                "38.5",
                "62.5",
                "--out-dir",
                "/deriv/tedana/sub-01/task-rest",
                "--prefix",
                "sub-01_task-rest_space-Native",
                "--fittype",
                "curvefit",
                "--tedpca",
                "kic",
                "--verbose",
            ]
        );
    }

    #[test]
    fn args_with_all_options() {
        let opts = TedanaOptions {
            fittype: FitType::Loglin,
            tedpca: TedPca::Aic,
            gscontrol: vec![GsControl::Gsr, GsControl::Mir],
            verbose: false,
            n_threads: Some(4),
            overwrite: true,
        };
        let args = strings(&build_tedana_args(&row(), &opts));
        let tail: Vec<&str> = args[12..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "--fittype",
                "loglin",
                "--tedpca",
                "aic",
                "--gscontrol",
                "gsr",
                "mir",
                "--n-threads",
                "4",
                "--overwrite",
            ]
        );
    }

    #[test]
    fn echo_time_conversion() {
        assert_eq!(echo_time_ms_arg(0.0145), "14.5");
        assert_eq!(echo_time_ms_arg(0.0385), "38.5");
        assert_eq!(echo_time_ms_arg(0.012), "12");
        assert_eq!(echo_time_ms_arg(0.00925), "9.25");
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("CurveFit".parse::<FitType>().expect("fittype"), FitType::Curvefit);
        assert_eq!("mdl".parse::<TedPca>().expect("tedpca"), TedPca::Mdl);
        assert_eq!(" gsr ".parse::<GsControl>().expect("gscontrol"), GsControl::Gsr);
    }

    #[test]
    fn unknown_enum_value_lists_choices() {
        let err = "kundu".parse::<TedPca>().unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("mdl, kic, aic"));
    }

    #[test]
    fn render_quotes_whitespace() {
        let args: Vec<OsString> = vec!["-d".into(), "/my data/a.nii.gz".into()];
        assert_eq!(render_command("tedana", &args), "tedana -d '/my data/a.nii.gz'");
    }
}
