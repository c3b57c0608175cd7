//! The end-to-end pre-flight check.
//!
//! All I/O happens up front: database, exception list, module index and
//! inventory. Evaluation then runs over immutable snapshots.

use crate::report::{Report, ReportOptions};
use hwcompat_core::{CheckConfig, CompatError, InventoryProvider};
use hwcompat_db::{DeprecationDatabase, ExceptionList};
use hwcompat_engine::CompatibilityEngine;
use hwcompat_kmod::select_resolver;

/// Run a check with `config` against the devices `inventory` reports.
///
/// Fails only on fatal errors; a missing module index degrades the run and
/// is noted in the report.
pub fn run_check(config: &CheckConfig, inventory: &dyn InventoryProvider) -> Result<Report, CompatError> {
    let database = DeprecationDatabase::load(&config.database_path)?;

    let exceptions = match &config.exceptions_path {
        Some(path) => ExceptionList::load_optional(path)?,
        None => ExceptionList::empty(),
    };

    let selected = select_resolver(config.skip_kmod, &config.kmod_index_dir);

    let devices = inventory.devices()?;
    let loaded_modules = inventory.loaded_modules()?;
    tracing::info!(
        inventory = inventory.name(),
        devices = devices.len(),
        loaded_modules = loaded_modules.len(),
        target_version = %config.target_version,
        resolver = %selected.mode,
        "starting compatibility check"
    );

    let engine = CompatibilityEngine::new(&database)
        .with_resolver(selected.resolver.as_ref())
        .with_exceptions(&exceptions);
    let verdicts = engine.evaluate(&devices, config.target_version);
    let modules = engine.evaluate_modules(&loaded_modules, &devices, config.target_version);

    Ok(Report::assemble(
        &verdicts,
        &modules,
        &database,
        config.target_version,
        &selected.mode,
        ReportOptions::from(config),
    ))
}
