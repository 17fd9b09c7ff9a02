/// Data layer: core types, loading, fetching, filtering and export.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet            World Bank API / .csv / .json
///        │                                     │
///        ▼                                     ▼
///   ┌──────────┐                        ┌────────────┐
///   │  loader   │ clean → yearly mean   │ worldbank   │ EconomicSource
///   └──────────┘                        └────────────┘
///        │                                     │
///        ▼                                     ▼
///   ┌─────────────┐                     ┌───────────────┐
///   │ HealthTable  │                     │ EconomicTable  │
///   └─────────────┘                     └───────────────┘
///        └──────────────┬──────────────────────┘
///                       ▼
///                 ┌──────────┐
///                 │  filter   │  Selection → filtered tables, min-max
///                 └──────────┘
///                       │
///                       ▼
///                 ┌──────────┐
///                 │  export   │  filtered tables → CSV
///                 └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod worldbank;
