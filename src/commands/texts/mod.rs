//! Read-only views over the stored passages: listing, detail, coverage and
//! aggregate statistics.

use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::catalog::Catalog;
use crate::cli::{CoverageArgs, ListArgs, ShowArgs, StatsArgs};
use crate::commands::open_catalog_store;
use crate::model::{GroupCount, ReadingTextRecord};
use crate::store::{
    GroupColumn, RecordOrder, TextFilter, count_by, count_records, count_with_body,
    coverage_matrix, get_record, query_records,
};
use crate::util::preview;

mod output;
mod run;

pub use run::{run_coverage, run_list, run_show, run_stats};
