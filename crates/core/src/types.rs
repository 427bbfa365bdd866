/// Echo number parsed from the `echo-<n>` filename entity (1-based).
pub type EchoIndex = u32;

/// Echo times as recorded in BIDS sidecars, in seconds.
pub type EchoTimeSecs = f64;
