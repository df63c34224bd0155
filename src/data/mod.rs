/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///  .json / .csv / .tsv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  Vec<Row>, column index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  conjunctive constraints → filtered subset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  subset → delimited text
///   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
