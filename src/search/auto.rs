//! The `auto_transform` orchestrator
//!
//! Runs the per-family calculators in a fixed dependency order over an
//! evolving dataset, accumulates the emitted specs with their lineage
//! maps, resolves the two-way distribution-shaping branch, and finishes
//! with a backward dependency-pruning pass.

use crate::dataset;
use crate::error::Result;
use crate::model::{Direction, Model, Scoring};
use crate::search::calculators::{
    CategoricalEncodingParamCalculator, ColumnSelectionParamCalculator,
    CyclicalFeaturesTransformerParamCalculator, DateTimeTransformerParamCalculator,
    DimensionalityReductionParamCalculator, MathematicalOperationsParamCalculator,
    MissingValuesIndicatorParamCalculator, MissingValuesParamCalculator,
    NonLinearTransformationParamCalculator, NormalizationParamCalculator,
    NumericalBinningParamCalculator, OutliersParamCalculator, ParamCalculator,
    QuantileTransformationParamCalculator, ScaleTransformationParamCalculator,
    SplineTransformationParamCalculator,
};
use crate::search::{
    evaluate_model, CvStrategy, NoopLogger, SearchContext, SearchLogger, TracingLogger,
};
use crate::transforms::{
    retain_spec_columns, ColumnSelection, ColumnSelectionParams, Lineage, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Orchestrator knobs beyond the scoring setup.
#[derive(Debug, Clone, Default)]
pub struct AutoTransformOptions {
    pub cv: CvStrategy,
    pub verbose: bool,
}

/// Immutable search state threaded through the stages. Every stage
/// consumes a state and returns a new one; nothing is mutated in place,
/// so each stage is a pure function of its input and can be tested in
/// isolation.
#[derive(Debug, Clone)]
struct SearchState {
    x: DataFrame,
    pipeline: Vec<TransformSpec>,
    lineages: Vec<Lineage>,
    exclude_from_selection: BTreeSet<String>,
    exclude_from_dimred: BTreeSet<String>,
}

impl SearchState {
    fn new(x: DataFrame) -> Self {
        Self {
            x,
            pipeline: Vec::new(),
            lineages: Vec::new(),
            exclude_from_selection: BTreeSet::new(),
            exclude_from_dimred: BTreeSet::new(),
        }
    }

    fn column_set(&self) -> BTreeSet<String> {
        self.x
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }
}

/// Search an ordered pipeline of transformation specs that improves the
/// cross-validated score of `model` on `(x, y)`.
///
/// The stage order is fixed: indicator flags, imputation, outlier
/// handling, spline expansion, binning, the distribution branch
/// (non-linear + normalization vs quantile), mathematical operations,
/// final scaling, datetime and cyclical expansion, categorical encoding,
/// column selection, dimensionality reduction, then backward pruning.
pub fn auto_transform(
    x: &DataFrame,
    y: &Array1<f64>,
    model: &dyn Model,
    scoring: Scoring,
    direction: Direction,
    groups: Option<&Array1<i64>>,
    options: AutoTransformOptions,
) -> Result<Vec<TransformSpec>> {
    let noop = NoopLogger;
    let tracing_logger = TracingLogger;
    let logger: &dyn SearchLogger = if options.verbose {
        &tracing_logger
    } else {
        &noop
    };

    let mut ctx = SearchContext::new(model, scoring, direction, logger).with_cv(options.cv);
    if let Some(groups) = groups {
        ctx = ctx.with_groups(groups);
    }

    logger.task_start("Starting automated transformation search");
    logger.task_update(&format!(
        "Input shape: ({}, {})",
        x.height(),
        x.width()
    ));

    let x = dataset::cast_numeric_to_f64(x)?;
    let initial_columns: Vec<String> = x
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    let initial_num_columns = dataset::numerical_columns(&x);

    let mut state = SearchState::new(x);

    // Missing values and outliers
    let (next, new_columns) =
        run_stage(state, &MissingValuesIndicatorParamCalculator, y, &ctx, None)?;
    state = next;
    state.exclude_from_dimred.extend(new_columns);

    let (next, _) = run_stage(state, &MissingValuesParamCalculator, y, &ctx, None)?;
    state = next;

    let (next, _) = run_stage(state, &OutliersParamCalculator, y, &ctx, None)?;
    state = next;

    // Feature engineering on the original numeric columns
    let (next, new_columns) = run_stage(
        state,
        &SplineTransformationParamCalculator,
        y,
        &ctx,
        Some(&initial_num_columns),
    )?;
    state = next;
    state.exclude_from_selection.extend(new_columns.clone());
    state.exclude_from_dimred.extend(new_columns);

    let (next, new_columns) = run_stage(
        state,
        &NumericalBinningParamCalculator,
        y,
        &ctx,
        Some(&initial_num_columns),
    )?;
    state = next;
    state.exclude_from_dimred.extend(new_columns);

    // Distribution shaping: run both alternatives from the same state and
    // keep the better-scoring one (direction-aware).
    state = choose_distribution_branch(state, y, &ctx)?;

    // Pairwise arithmetic on the original numeric columns
    let (next, _) = run_stage(
        state,
        &MathematicalOperationsParamCalculator,
        y,
        &ctx,
        Some(&initial_num_columns),
    )?;
    state = next;

    // Final scaling over everything numeric
    let (next, _) = run_stage(state, &ScaleTransformationParamCalculator, y, &ctx, None)?;
    state = next;

    // Periodic features
    let (next, datetime_columns) =
        run_stage(state, &DateTimeTransformerParamCalculator, y, &ctx, None)?;
    state = next;

    if !datetime_columns.is_empty() {
        let subset: Vec<String> = datetime_columns.iter().cloned().collect();
        let (next, new_columns) = run_stage(
            state,
            &CyclicalFeaturesTransformerParamCalculator,
            y,
            &ctx,
            Some(&subset),
        )?;
        state = next;
        state.exclude_from_dimred.extend(new_columns);
    }

    // Categorical encoding
    let (next, new_columns) =
        run_stage(state, &CategoricalEncodingParamCalculator, y, &ctx, None)?;
    state = next;
    state.exclude_from_selection.extend(new_columns.clone());
    state.exclude_from_dimred.extend(new_columns);

    // Feature reduction. The calculator picks among its candidate subset;
    // columns outside the subset (synthetic spline/encoding outputs and
    // anything non-numeric) must survive the stage, so the emitted
    // selection is widened to keep them.
    let columns_for_selection: Vec<String> = dataset::numerical_columns(&state.x)
        .into_iter()
        .filter(|c| !state.exclude_from_selection.contains(c))
        .collect();
    state = run_selection_stage(state, y, &ctx, &columns_for_selection)?;

    let columns_for_dimred: Vec<String> = dataset::numerical_columns(&state.x)
        .into_iter()
        .filter(|c| !state.exclude_from_dimred.contains(c))
        .collect();
    let (next, _) = run_stage(
        state,
        &DimensionalityReductionParamCalculator,
        y,
        &ctx,
        Some(&columns_for_dimred),
    )?;
    state = next;

    // Drop everything the final feature set does not depend on
    let final_columns = state.column_set();
    prune_pipeline(
        &state.pipeline,
        &state.lineages,
        &initial_columns,
        &final_columns,
    )
}

/// Run one calculator stage: compute the best spec on the (optionally
/// column-restricted) dataset, materialize it over the full dataset, and
/// record the spec, its lineage, and the newly created columns.
fn run_stage(
    state: SearchState,
    calculator: &dyn ParamCalculator,
    y: &Array1<f64>,
    ctx: &SearchContext,
    subset: Option<&[String]>,
) -> Result<(SearchState, BTreeSet<String>)> {
    let x_view = match subset {
        Some(columns) if !columns.is_empty() => {
            state.x.select(columns.iter().map(|s| s.as_str()))?
        }
        _ => state.x.clone(),
    };

    let Some(spec) = calculator.calculate_best_params(&x_view, y, ctx)? else {
        return Ok((state, BTreeSet::new()));
    };

    apply_spec(state, spec, y)
}

/// Column-selection stage. The RFA-driven calculator sees only its
/// candidate columns; the final spec re-adds every current column that
/// was not a candidate so the stage never discards synthetic features it
/// was told to leave alone.
fn run_selection_stage(
    state: SearchState,
    y: &Array1<f64>,
    ctx: &SearchContext,
    candidates: &[String],
) -> Result<SearchState> {
    if candidates.is_empty() {
        return Ok(state);
    }
    let x_view = state.x.select(candidates.iter().map(|s| s.as_str()))?;

    let Some(spec) = ColumnSelectionParamCalculator.calculate_best_params(&x_view, y, ctx)? else {
        return Ok(state);
    };

    let selected: BTreeSet<String> = match Transform::from_spec(&spec)? {
        Transform::ColumnSelection(sel) => sel.params().features.into_iter().collect(),
        _ => unreachable!("selection calculator emits ColumnSelection specs"),
    };
    let candidate_set: BTreeSet<String> = candidates.iter().cloned().collect();

    // Frame order, dropping only rejected candidates
    let features: Vec<String> = state
        .x
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .filter(|c| !candidate_set.contains(c) || selected.contains(c))
        .collect();

    let widened = Transform::ColumnSelection(ColumnSelection::new(ColumnSelectionParams {
        features,
    }));
    let (next, _) = apply_spec(state, widened.spec()?, y)?;
    Ok(next)
}

/// Materialize a spec over the full dataset and push it (with its
/// lineage and the newly created columns) onto the state.
fn apply_spec(
    state: SearchState,
    spec: TransformSpec,
    y: &Array1<f64>,
) -> Result<(SearchState, BTreeSet<String>)> {
    let mut transform = Transform::from_spec(&spec)?;
    let transformed = transform.fit_transform(&state.x, Some(y))?;
    let lineage = transform.lineage();

    let before = state.column_set();
    let after: BTreeSet<String> = transformed
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    let new_columns: BTreeSet<String> = after.difference(&before).cloned().collect();

    let mut pipeline = state.pipeline;
    let mut lineages = state.lineages;
    pipeline.push(spec);
    lineages.push(lineage);

    Ok((
        SearchState {
            x: transformed,
            pipeline,
            lineages,
            exclude_from_selection: state.exclude_from_selection,
            exclude_from_dimred: state.exclude_from_dimred,
        },
        new_columns,
    ))
}

/// Two-way branch: (non-linear then normalization) versus (quantile
/// transformation), both from the same pre-branch state. The comparison
/// honors `direction`; ties and double-missing scores fall to the
/// quantile branch.
fn choose_distribution_branch(
    state: SearchState,
    y: &Array1<f64>,
    ctx: &SearchContext,
) -> Result<SearchState> {
    let (branch_1, _) = run_stage(
        state.clone(),
        &NonLinearTransformationParamCalculator,
        y,
        ctx,
        None,
    )?;
    let (branch_1, _) = run_stage(branch_1, &NormalizationParamCalculator, y, ctx, None)?;

    let (branch_2, _) = run_stage(
        state,
        &QuantileTransformationParamCalculator,
        y,
        ctx,
        None,
    )?;

    let score_1 = evaluate_model(&branch_1.x, y, ctx, None)?;
    let score_2 = evaluate_model(&branch_2.x, y, ctx, None)?;

    if ctx.direction.improved_opt(score_1, score_2) {
        ctx.logger
            .task_result("Selected branch: non-linear + normalization");
        Ok(branch_1)
    } else {
        ctx.logger.task_result("Selected branch: quantile transformation");
        Ok(branch_2)
    }
}

/// Backward dependency pruning.
///
/// Walk the pipeline in reverse, growing the required-column set through
/// each spec's lineage map, trimming each spec's column-keyed parameters
/// to required entries, and dropping specs that end up empty. A column
/// selection over the retained original input columns is prepended so the
/// shipped pipeline never references a column that is not eventually
/// consumed by the final feature set.
pub fn prune_pipeline(
    pipeline: &[TransformSpec],
    lineages: &[Lineage],
    initial_columns: &[String],
    final_columns: &BTreeSet<String>,
) -> Result<Vec<TransformSpec>> {
    let mut required: BTreeSet<String> = final_columns.clone();
    let mut filtered: Vec<TransformSpec> = Vec::new();

    for (spec, lineage) in pipeline.iter().zip(lineages.iter()).rev() {
        let additional: Vec<String> = lineage
            .iter()
            .filter(|(output, _)| required.contains(*output))
            .flat_map(|(_, sources)| sources.iter().cloned())
            .collect();
        required.extend(additional);

        if let Some(trimmed) = retain_spec_columns(spec, &required)? {
            filtered.push(trimmed);
        }
    }

    let selected: Vec<String> = initial_columns
        .iter()
        .filter(|c| required.contains(*c))
        .cloned()
        .collect();
    let selector = Transform::ColumnSelection(ColumnSelection::new(ColumnSelectionParams {
        features: selected,
    }));
    filtered.push(selector.spec()?);

    filtered.reverse();
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::{
        MathOperator, MathOpsParams, MathematicalOperations, MissingValuesIndicator,
        MissingValuesIndicatorParams,
    };

    fn spec_of(t: Transform) -> (TransformSpec, Lineage) {
        let lineage = t.lineage();
        (t.spec().unwrap(), lineage)
    }

    fn pipeline_fixture() -> (Vec<TransformSpec>, Vec<Lineage>, Vec<String>) {
        // indicator on a and b, then a*c synthesis
        let (indicator_spec, indicator_lineage) =
            spec_of(Transform::MissingValuesIndicator(MissingValuesIndicator::new(
                MissingValuesIndicatorParams {
                    features: vec!["a".to_string(), "b".to_string()],
                },
            )));
        let (math_spec, math_lineage) =
            spec_of(Transform::MathematicalOperations(MathematicalOperations::new(
                MathOpsParams {
                    operations_options: vec![(
                        "a".to_string(),
                        "c".to_string(),
                        MathOperator::Multiply,
                    )],
                },
            )));

        (
            vec![indicator_spec, math_spec],
            vec![indicator_lineage, math_lineage],
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        )
    }

    #[test]
    fn test_prune_drops_specs_with_no_required_entries() {
        let (pipeline, lineages, initial) = pipeline_fixture();

        // Final features: only the untouched column c. Neither the
        // indicator flags nor the product column are needed.
        let final_columns: BTreeSet<String> = BTreeSet::from(["c".to_string()]);

        let pruned = prune_pipeline(&pipeline, &lineages, &initial, &final_columns).unwrap();

        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].name, "ColumnSelection");
        let selector = Transform::from_spec(&pruned[0]).unwrap();
        match selector {
            Transform::ColumnSelection(sel) => {
                assert_eq!(sel.params().features, vec!["c".to_string()]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_prune_trims_entries_to_required_sources() {
        let (pipeline, lineages, initial) = pipeline_fixture();

        // Only the product column is needed; a and c become required as
        // its sources, so the indicator survives trimmed to the a-flag.
        let final_columns: BTreeSet<String> =
            BTreeSet::from(["a__multiply__c".to_string()]);

        let pruned = prune_pipeline(&pipeline, &lineages, &initial, &final_columns).unwrap();

        assert_eq!(pruned.len(), 3);
        assert_eq!(pruned[0].name, "ColumnSelection");
        match Transform::from_spec(&pruned[0]).unwrap() {
            Transform::ColumnSelection(sel) => {
                assert_eq!(sel.params().features, vec!["a".to_string(), "c".to_string()]);
            }
            _ => unreachable!(),
        }
        match Transform::from_spec(&pruned[1]).unwrap() {
            Transform::MissingValuesIndicator(ind) => {
                assert_eq!(ind.params().features, vec!["a".to_string()]);
            }
            _ => unreachable!(),
        }
        assert_eq!(pruned[2].name, "MathematicalOperations");
    }

    #[test]
    fn test_prune_keeps_used_indicator() {
        let (pipeline, lineages, initial) = pipeline_fixture();

        let final_columns: BTreeSet<String> = BTreeSet::from([
            "a__missing".to_string(),
            "a__multiply__c".to_string(),
        ]);

        let pruned = prune_pipeline(&pipeline, &lineages, &initial, &final_columns).unwrap();
        assert_eq!(pruned.len(), 3);
        assert_eq!(pruned[1].name, "MissingValuesIndicator");

        // Only the a-flag survives trimming
        let indicator = Transform::from_spec(&pruned[1]).unwrap();
        match indicator {
            Transform::MissingValuesIndicator(ind) => {
                assert_eq!(ind.params().features, vec!["a".to_string()]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_prune_is_idempotent() {
        let (pipeline, lineages, initial) = pipeline_fixture();
        let final_columns: BTreeSet<String> = BTreeSet::from([
            "a__missing".to_string(),
            "a__multiply__c".to_string(),
        ]);

        let once = prune_pipeline(&pipeline, &lineages, &initial, &final_columns).unwrap();

        // Rebuild lineages for the pruned pipeline and prune again
        let lineages_again: Vec<Lineage> = once
            .iter()
            .map(|spec| Transform::from_spec(spec).unwrap().lineage())
            .collect();
        let twice = prune_pipeline(&once, &lineages_again, &initial, &final_columns).unwrap();

        // The second pass adds no new selector and trims nothing further:
        // apart from the freshly prepended selector, the specs agree.
        assert_eq!(&twice[1..], &once[..]);

        let first_selector = Transform::from_spec(&twice[0]).unwrap();
        let second_selector = Transform::from_spec(&once[0]).unwrap();
        match (first_selector, second_selector) {
            (Transform::ColumnSelection(a), Transform::ColumnSelection(b)) => {
                assert_eq!(a.params().features, b.params().features);
            }
            _ => unreachable!(),
        }
    }
}
