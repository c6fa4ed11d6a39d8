/// Data layer: array codec, core types, structure inference and validity.
///
/// Architecture:
/// ```text
///   .npy bytes
///        │
///        ▼
///   ┌──────────┐
///   │   npy    │  sniff header + element width → flat f64 values
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ analyzer │  channels, regime, rate estimate → StructureReport
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ channel  │  de-interleave the primary PPG stream
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  regime-dependent validity bounds → kept samples
///   └──────────┘
/// ```

pub mod analyzer;
pub mod channel;
pub mod filter;
pub mod model;
pub mod npy;
