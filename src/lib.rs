//! # doc-distill
//!
//! A schema-driven extraction pipeline turning document corpora into
//! structured records and multi-view reports.
//!
//! doc-distill scans a corpus of PDF reports (either a nested
//! city/category/type/building taxonomy or a flat directory), extracts each
//! document's text and embedded images, asks a generative provider to fill
//! a field schema — fixed for building-inspection records, sampled per
//! document for heterogeneous corpora — derives validated improvement
//! suggestions, and consolidates everything into synchronized CSV/JSON
//! views.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────────┐   ┌──────────────┐
//! │   Scanner   │──▶│   Per-document pipeline  │──▶│    Export    │
//! │ taxonomy /  │   │ extract → language →     │   │ CSV + JSON + │
//! │    flat     │   │ schema → record → sugg.  │   │ partitions + │
//! └─────────────┘   └──────────────────────────┘   │  binarized   │
//!                                                  └──────────────┘
//! ```
//!
//! Every per-document failure is absorbed at its own boundary: a corrupt
//! file, a dead provider, or an invalid suggestion candidate degrades that
//! one result and the batch keeps its one-row-per-document invariant.
//!
//! ## Quick Start
//!
//! ```bash
//! distill init                  # create output directories
//! distill scan                  # list the discovered corpus
//! distill run                   # process the corpus and write all views
//! distill stats                 # inspect what a run has produced
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`scanner`] | Corpus discovery |
//! | [`extract`] | Per-document text and image extraction |
//! | [`language`] | Script-based language routing |
//! | [`schema`] | Field schema construction |
//! | [`provider`] | Generative extraction capability |
//! | [`structuring`] | Structured extraction with validation and fallback |
//! | [`suggest`] | Derived improvement suggestions |
//! | [`export`] | Multi-view batch output |
//! | [`pipeline`] | Run orchestration |
//! | [`stats`] | Output-tree statistics |

pub mod config;
pub mod export;
pub mod extract;
pub mod language;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod scanner;
pub mod schema;
pub mod stats;
pub mod structuring;
pub mod suggest;
