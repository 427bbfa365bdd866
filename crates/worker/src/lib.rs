//! `mebatch` -- batch multi-echo denoising with tedana.
//!
//! Walks an fMRIPrep derivatives tree (run with `--me-output-echoes`) and the
//! matching raw BIDS tree, groups the per-echo images by acquisition, reads
//! echo times from the raw sidecars and runs one `tedana` process per
//! acquisition on a fixed-size pool.
//!
//! # Environment variables
//!
//! | Variable                | Default                      | Description                         |
//! |-------------------------|------------------------------|-------------------------------------|
//! | `MEBATCH_FMRIPREP_DIR`  | --                           | fMRIPrep output directory           |
//! | `MEBATCH_BIDS_DIR`      | --                           | BIDS dataset root                   |
//! | `MEBATCH_RAW_SUBDIR`    | `rawdata`                    | Raw-data directory under the root   |
//! | `MEBATCH_CORES`         | available CPUs               | Concurrent tedana processes         |
//! | `MEBATCH_OUT_ROOT`      | `<fmriprep parent>/tedana`   | Output root                         |
//! | `MEBATCH_STAGGER_SECS`  | `2`                          | Pause before each job               |
//! | `MEBATCH_TIMEOUT_SECS`  | none                         | Per-job time limit                  |
//! | `MEBATCH_TEDANA_BIN`    | `tedana` on `PATH`           | tedana executable                   |
//! | `MEBATCH_REPORT`        | none                         | JSON report path                    |
//! | `RUST_LOG`              | `mebatch=info,...`           | Log filter                          |

pub mod app;
pub mod cli;
pub mod output;
