//! Packing engine for single-container cargo loading.
//!
//! Implements a deterministic greedy shelf heuristic: the container volume is
//! partitioned into horizontal shelves, each shelf into rows, each row filled
//! left to right. At every open slot the first ranked carton type with
//! remaining quantity, weight headroom and geometric fit is placed. Support
//! is guaranteed by construction: every unit rests on the container floor or
//! on a shelf boundary.
//!
//! The heuristic deliberately does not rotate items and does not backfill the
//! vertical gaps above shorter items within a shelf. Changing either would
//! change utilization outputs and break reproducibility.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::geometry::{container_bounds, overlap_1d, placement_bounds};
use crate::model::{CartonType, Container, PackStatus, PackingResult, PlacedItem, TypeBreakdown};
use crate::types::{Dimensional, EPSILON_GENERAL, EPSILON_HEIGHT, Vec3, Weighted};

/// Configuration for the packing engine.
///
/// Contains the tolerances and limits steering a packing run.
#[derive(Copy, Clone, Debug)]
pub struct PackingConfig {
    /// Numerical tolerance for fit and weight comparisons
    pub tolerance: f64,
    /// Weight utilization percentage above which a partial load is attributed
    /// to the weight limit rather than to space
    pub weight_attribution_threshold: f64,
    /// Hard cap on the number of placements in one run; stops the run when
    /// reached
    pub max_placements: usize,
}

impl PackingConfig {
    pub const DEFAULT_TOLERANCE: f64 = EPSILON_GENERAL;
    pub const DEFAULT_WEIGHT_ATTRIBUTION_THRESHOLD: f64 = 95.0;
    pub const DEFAULT_MAX_PLACEMENTS: usize = 1_000_000;

    /// Creates a builder for custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            tolerance: Self::DEFAULT_TOLERANCE,
            weight_attribution_threshold: Self::DEFAULT_WEIGHT_ATTRIBUTION_THRESHOLD,
            max_placements: Self::DEFAULT_MAX_PLACEMENTS,
        }
    }
}

/// Builder for PackingConfig.
#[derive(Clone, Debug)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl Default for PackingConfigBuilder {
    fn default() -> Self {
        Self {
            config: PackingConfig::default(),
        }
    }
}

impl PackingConfigBuilder {
    /// Sets the numerical tolerance.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Sets the weight attribution threshold in percent.
    pub fn weight_attribution_threshold(mut self, threshold: f64) -> Self {
        self.config.weight_attribution_threshold = threshold;
        self
    }

    /// Sets the placement cap.
    pub fn max_placements(mut self, cap: usize) -> Self {
        self.config.max_placements = cap;
        self
    }

    /// Creates the final configuration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Events emitted during a packing run, enabling live visualization.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new shelf has been opened at the given floor height.
    ShelfStarted { index: usize, z: f64 },
    /// One unit was placed.
    ItemPlaced {
        carton_id: String,
        position: (f64, f64, f64),
        dims: (f64, f64, f64),
        weight: f64,
        total_weight: f64,
    },
    /// Packing finished.
    Finished { placed: u64, requested: u64 },
}

/// Mutable state of one packing run.
///
/// Owned exclusively by a single invocation; the engine itself keeps no state
/// between calls.
struct PackState {
    remaining: Vec<u32>,
    packed: Vec<u32>,
    placed: Vec<PlacedItem>,
    total_weight: f64,
}

impl PackState {
    fn new(cartons: &[CartonType]) -> Self {
        Self {
            remaining: cartons.iter().map(|c| c.quantity).collect(),
            packed: vec![0; cartons.len()],
            placed: Vec::new(),
            total_weight: 0.0,
        }
    }

    /// Records one placed unit of the carton type at `index`.
    fn place(&mut self, index: usize, carton: &CartonType, position: (f64, f64, f64)) {
        self.remaining[index] -= 1;
        self.packed[index] += 1;
        self.total_weight += carton.weight;
        self.placed.push(PlacedItem {
            carton_id: carton.id.clone(),
            position,
            color: carton.display_color(),
        });
    }
}

/// Packs carton types into a single container with default configuration.
///
/// The entry point is infallible by contract: invalid inputs yield a result
/// with status `error` and an explanatory message rather than a panic or an
/// error type. Identical inputs always produce an identical result.
///
/// # Parameters
/// * `container` - The loading space
/// * `cartons` - The carton types with requested quantities
///
/// # Returns
/// `PackingResult` with all placements and utilization metrics
pub fn pack(container: &Container, cartons: &[CartonType]) -> PackingResult {
    pack_with_config(container, cartons, PackingConfig::default())
}

/// Packing with custom configuration.
///
/// Like `pack`, but with adjustable tolerances and limits.
pub fn pack_with_config(
    container: &Container,
    cartons: &[CartonType],
    config: PackingConfig,
) -> PackingResult {
    pack_with_progress(container, cartons, config, |_| {})
}

/// Packing with custom configuration and a live progress callback.
///
/// Invokes the callback for every shelf opening and placement (suitable for
/// SSE/WebSocket streaming).
pub fn pack_with_progress(
    container: &Container,
    cartons: &[CartonType],
    config: PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    if let Err(err) = validate_inputs(container, cartons) {
        return PackingResult {
            placed_items: Vec::new(),
            total_weight: 0.0,
            volume_utilization: 0.0,
            weight_utilization: 0.0,
            status: PackStatus::Error,
            message: format!("Invalid input: {}", err),
            breakdown: breakdown_of(cartons, None),
        };
    }

    let total_requested: u64 = cartons.iter().map(|c| c.quantity as u64).sum();
    if total_requested == 0 {
        on_event(&PackEvent::Finished {
            placed: 0,
            requested: 0,
        });
        return PackingResult {
            placed_items: Vec::new(),
            total_weight: 0.0,
            volume_utilization: 0.0,
            weight_utilization: 0.0,
            status: PackStatus::Warning,
            message: "Nothing to pack: no units requested.".to_string(),
            breakdown: breakdown_of(cartons, None),
        };
    }

    let order = rank_types(cartons);
    let mut state = PackState::new(cartons);
    let (length, width, height) = container.dims;

    // Shelf loop: each iteration fills one horizontal layer, then advances
    // the floor by the tallest item placed in it.
    let mut z = 0.0;
    let mut shelf_index = 0usize;
    'shelves: while z < height {
        let mut shelf_height = 0.0f64;
        let mut shelf_announced = false;
        let mut y = 0.0f64;

        // Row loop: each iteration fills one strip along the length, then
        // advances by the widest item placed in it.
        while y < width {
            let mut row_width = 0.0f64;
            let mut x = 0.0f64;

            // Slot loop: first-fit scan of the ranked type list per slot.
            while x < length {
                let Some(index) = select_type(cartons, &order, &state, container, &config, x, y, z)
                else {
                    break;
                };
                if state.placed.len() >= config.max_placements {
                    break 'shelves;
                }

                if !shelf_announced {
                    on_event(&PackEvent::ShelfStarted {
                        index: shelf_index,
                        z,
                    });
                    shelf_announced = true;
                }

                let carton = &cartons[index];
                state.place(index, carton, (x, y, z));
                on_event(&PackEvent::ItemPlaced {
                    carton_id: carton.id.clone(),
                    position: (x, y, z),
                    dims: carton.dims,
                    weight: carton.weight,
                    total_weight: state.total_weight,
                });

                x += carton.dims.0;
                row_width = row_width.max(carton.dims.1);
                shelf_height = shelf_height.max(carton.dims.2);
            }

            if row_width <= 0.0 {
                break; // shelf complete
            }
            y += row_width;
        }

        if shelf_height <= 0.0 {
            break; // container full or quantities exhausted
        }
        z += shelf_height;
        shelf_index += 1;
    }

    let result = build_report(container, cartons, state, total_requested, &config);
    on_event(&PackEvent::Finished {
        placed: result.placed_items.len() as u64,
        requested: total_requested,
    });
    result
}

/// Checks the engine preconditions on raw input structs.
fn validate_inputs(
    container: &Container,
    cartons: &[CartonType],
) -> Result<(), crate::model::ValidationError> {
    container.validate()?;
    for carton in cartons {
        carton.validate()?;
    }
    Ok(())
}

/// Ranks carton types for placement priority.
///
/// Descending footprint, ties broken by descending weight. The sort is
/// stable, so input order decides when footprint and weight both tie. The
/// ranking is computed once per run and never re-evaluated per slot.
fn rank_types(cartons: &[CartonType]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..cartons.len()).collect();
    order.sort_by(|&a, &b| {
        let (ca, cb) = (&cartons[a], &cartons[b]);
        cb.footprint()
            .partial_cmp(&ca.footprint())
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                cb.weight()
                    .partial_cmp(&ca.weight())
                    .unwrap_or(Ordering::Equal)
            })
    });
    order
}

/// Selects the first ranked carton type that can occupy the slot at (x, y, z).
///
/// A type qualifies when it has remaining quantity, one more unit stays
/// within the global weight budget, and the unit's full extent fits inside
/// the container at the slot.
fn select_type(
    cartons: &[CartonType],
    order: &[usize],
    state: &PackState,
    container: &Container,
    config: &PackingConfig,
    x: f64,
    y: f64,
    z: f64,
) -> Option<usize> {
    let container_dims = container.dims_as_vec3();
    let slot = Vec3::new(x, y, z);
    for &index in order {
        let carton = &cartons[index];
        if state.remaining[index] == 0 {
            continue;
        }
        if state.total_weight + carton.weight > container.max_weight + config.tolerance {
            continue;
        }

        let far_corner = slot + carton.dims_as_vec3();
        if far_corner.fits_within(&container_dims, config.tolerance) {
            return Some(index);
        }
    }
    None
}

/// Aggregates the run state into the final result.
fn build_report(
    container: &Container,
    cartons: &[CartonType],
    state: PackState,
    total_requested: u64,
    config: &PackingConfig,
) -> PackingResult {
    let packed_volume: f64 = cartons
        .iter()
        .enumerate()
        .map(|(i, c)| c.volume() * f64::from(state.packed[i]))
        .sum();
    let volume_utilization = packed_volume / container.volume() * 100.0;
    let weight_utilization = state.total_weight / container.max_weight * 100.0;

    let placed_count = state.placed.len() as u64;
    let (status, message) = if placed_count == total_requested {
        (
            PackStatus::Success,
            format!("Full load optimal: {} items.", placed_count),
        )
    } else {
        let limiter = if weight_utilization > config.weight_attribution_threshold {
            "Weight"
        } else {
            "Space"
        };
        (
            PackStatus::Warning,
            format!(
                "Partial load: {}/{} items packed. {} limited.",
                placed_count, total_requested, limiter
            ),
        )
    };

    PackingResult {
        placed_items: state.placed,
        total_weight: state.total_weight,
        volume_utilization,
        weight_utilization,
        status,
        message,
        breakdown: breakdown_of(cartons, Some(&state.packed)),
    }
}

/// Builds the per-type breakdown map.
///
/// Duplicate carton ids merge by summing both counters, so the breakdown
/// invariants hold even for degenerate inputs.
fn breakdown_of(cartons: &[CartonType], packed: Option<&[u32]>) -> BTreeMap<String, TypeBreakdown> {
    let mut breakdown: BTreeMap<String, TypeBreakdown> = BTreeMap::new();
    for (i, carton) in cartons.iter().enumerate() {
        let entry = breakdown.entry(carton.id.clone()).or_insert(TypeBreakdown {
            packed: 0,
            requested: 0,
        });
        entry.requested += carton.quantity;
        entry.packed += packed.map_or(0, |counts| counts[i]);
    }
    breakdown
}

/// Independent audit of a finished load plan.
///
/// Re-derives the structural invariants the shelf construction is supposed to
/// guarantee. `resting_on_gap` counts units sitting on a shelf boundary with
/// an air gap directly beneath them; such gaps are an accepted trade-off of
/// the shelf heuristic and do not make a plan unsound.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlanDiagnostics {
    pub placements_audited: usize,
    pub out_of_bounds: usize,
    pub overlapping_pairs: usize,
    pub unsupported: usize,
    pub resting_on_gap: usize,
    pub weight_within_limit: bool,
    pub breakdown_consistent: bool,
}

impl PlanDiagnostics {
    /// Indicates whether the plan satisfies every structural invariant.
    pub fn is_clean(&self) -> bool {
        self.out_of_bounds == 0
            && self.overlapping_pairs == 0
            && self.unsupported == 0
            && self.weight_within_limit
            && self.breakdown_consistent
    }
}

/// Audits a load plan against the container and carton definitions.
///
/// Read-only; works on any `PackingResult`, not just those produced by this
/// engine.
pub fn audit_plan(
    container: &Container,
    cartons: &[CartonType],
    result: &PackingResult,
) -> PlanDiagnostics {
    let mut types: BTreeMap<&str, &CartonType> = BTreeMap::new();
    for carton in cartons {
        types.entry(carton.id.as_str()).or_insert(carton);
    }

    let mut known: Vec<(&PlacedItem, &CartonType)> = Vec::new();
    let mut unknown_types = 0usize;
    for item in &result.placed_items {
        match types.get(item.carton_id.as_str()) {
            Some(carton) => known.push((item, *carton)),
            None => unknown_types += 1,
        }
    }

    let hull = container_bounds(container);
    let bounds: Vec<_> = known
        .iter()
        .map(|(item, carton)| placement_bounds(item, carton))
        .collect();

    let out_of_bounds = bounds
        .iter()
        .filter(|b| !hull.contains(b, EPSILON_GENERAL))
        .count();

    let mut overlapping_pairs = 0usize;
    for i in 0..bounds.len() {
        for j in (i + 1)..bounds.len() {
            if bounds[i].intersects(&bounds[j]) {
                overlapping_pairs += 1;
            }
        }
    }

    let unsupported = count_unsupported(&known);
    let resting_on_gap = count_resting_on_gap(&known);

    let recomputed_weight: f64 = known.iter().map(|(_, carton)| carton.weight).sum();
    let weight_within_limit = recomputed_weight <= container.max_weight + EPSILON_GENERAL;

    let breakdown_consistent =
        unknown_types == 0 && breakdown_matches(&result.breakdown, &result.placed_items);

    PlanDiagnostics {
        placements_audited: result.placed_items.len(),
        out_of_bounds,
        overlapping_pairs,
        unsupported,
        resting_on_gap,
        weight_within_limit,
        breakdown_consistent,
    }
}

/// Counts units whose floor height is not a shelf boundary of the run.
///
/// Reconstructs the shelf boundaries from the plan: the distinct placement
/// floors must start at 0 and each next floor must equal the previous floor
/// plus the tallest unit standing on it.
fn count_unsupported(known: &[(&PlacedItem, &CartonType)]) -> usize {
    if known.is_empty() {
        return 0;
    }

    // Group placements by floor height.
    let mut floors: Vec<(f64, Vec<usize>)> = Vec::new();
    for (i, (item, _)) in known.iter().enumerate() {
        let z = item.position.2;
        match floors
            .iter_mut()
            .find(|(floor, _)| (*floor - z).abs() <= EPSILON_HEIGHT)
        {
            Some((_, members)) => members.push(i),
            None => floors.push((z, vec![i])),
        }
    }
    floors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let mut unsupported = 0usize;
    let mut expected = 0.0f64;
    for (floor, members) in &floors {
        if (floor - expected).abs() <= EPSILON_HEIGHT {
            let tallest = members
                .iter()
                .map(|&i| known[i].1.dims.2)
                .fold(0.0f64, f64::max);
            expected = floor + tallest;
        } else {
            unsupported += members.len();
        }
    }
    unsupported
}

/// Counts units that rest on a shelf boundary without direct contact below.
///
/// A unit has direct contact when the container floor or some other unit's
/// top face lies at its floor height with a positive footprint overlap.
fn count_resting_on_gap(known: &[(&PlacedItem, &CartonType)]) -> usize {
    known
        .iter()
        .filter(|(item, carton)| {
            let bounds = placement_bounds(item, carton);
            if bounds.min.z <= EPSILON_HEIGHT {
                return false;
            }
            !known.iter().any(|(other, other_carton)| {
                if std::ptr::eq::<PlacedItem>(*other, *item) {
                    return false;
                }
                let below = placement_bounds(other, other_carton);
                (below.top_z() - bounds.min.z).abs() <= EPSILON_HEIGHT
                    && overlap_1d(bounds.min.x, bounds.max.x, below.min.x, below.max.x) > 0.0
                    && overlap_1d(bounds.min.y, bounds.max.y, below.min.y, below.max.y) > 0.0
            })
        })
        .count()
}

/// Verifies the breakdown map against the placement list.
fn breakdown_matches(
    breakdown: &BTreeMap<String, TypeBreakdown>,
    placed_items: &[PlacedItem],
) -> bool {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for item in placed_items {
        *counts.entry(item.carton_id.as_str()).or_insert(0) += 1;
    }

    let packed_sum: u64 = breakdown.values().map(|b| b.packed as u64).sum();
    if packed_sum != placed_items.len() as u64 {
        return false;
    }

    breakdown.iter().all(|(id, entry)| {
        entry.packed <= entry.requested
            && counts.get(id.as_str()).copied().unwrap_or(0) == entry.packed
    }) && counts.keys().all(|id| breakdown.contains_key(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidationError;

    /// The 20' Standard preset used by the reference scenarios.
    fn twenty_foot() -> Container {
        Container::new(Some("20' Standard".to_string()), (5.898, 2.352, 2.393), 28200.0).unwrap()
    }

    fn carton(
        id: &str,
        dims: (f64, f64, f64),
        weight: f64,
        quantity: u32,
    ) -> CartonType {
        CartonType::new(id, id.to_uppercase(), dims, weight, quantity, None).unwrap()
    }

    fn assert_clean(container: &Container, cartons: &[CartonType], result: &PackingResult) {
        let diagnostics = audit_plan(container, cartons, result);
        assert!(
            diagnostics.is_clean(),
            "plan failed audit: {:?}",
            diagnostics
        );
    }

    #[test]
    fn full_load_places_every_unit() {
        let container = twenty_foot();
        let cartons = vec![carton("box", (0.8, 0.6, 0.6), 25.0, 20)];

        let result = pack(&container, &cartons);

        assert_eq!(result.placed_count(), 20);
        assert_eq!(result.status, PackStatus::Success);
        assert!(result.is_complete());
        assert_eq!(result.breakdown["box"].packed, 20);
        assert_eq!(result.breakdown["box"].requested, 20);
        assert!((result.total_weight - 500.0).abs() < EPSILON_GENERAL);
        assert_clean(&container, &cartons, &result);
    }

    #[test]
    fn weight_limited_load_stops_at_the_budget() {
        let container = twenty_foot();
        let cartons = vec![carton("box", (0.8, 0.6, 0.6), 1500.0, 20)];

        let result = pack(&container, &cartons);

        // 18 * 1500 = 27000 <= 28200 < 19 * 1500
        assert_eq!(result.placed_count(), 18);
        assert_eq!(result.status, PackStatus::Warning);
        assert_eq!(result.breakdown["box"].packed, 18);
        assert!(result.message.contains("Weight limited"));
        assert!(result.weight_utilization > 95.0);
        assert_clean(&container, &cartons, &result);
    }

    #[test]
    fn space_limited_load_reports_space() {
        let container = twenty_foot();
        let cartons = vec![carton("slab", container.dims, 10.0, 2)];

        let result = pack(&container, &cartons);

        // The second unit would need a shelf beyond the container height.
        assert_eq!(result.placed_count(), 1);
        assert_eq!(result.status, PackStatus::Warning);
        assert_eq!(result.breakdown["slab"].packed, 1);
        assert!(result.message.contains("Space limited"));
        assert_eq!(result.placed_items[0].position, (0.0, 0.0, 0.0));
        assert_clean(&container, &cartons, &result);
    }

    #[test]
    fn empty_input_yields_warning() {
        let container = twenty_foot();

        let result = pack(&container, &[]);

        assert!(result.placed_items.is_empty());
        assert_eq!(result.status, PackStatus::Warning);
        assert!((result.volume_utilization - 0.0).abs() < EPSILON_GENERAL);
        assert!((result.weight_utilization - 0.0).abs() < EPSILON_GENERAL);
        assert!(result.message.contains("Nothing to pack"));
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn oversized_type_yields_empty_plan() {
        let container = Container::new(None, (2.0, 2.0, 2.0), 100.0).unwrap();
        let cartons = vec![carton("big", (3.0, 1.0, 1.0), 1.0, 4)];

        let result = pack(&container, &cartons);

        assert!(result.placed_items.is_empty());
        assert_eq!(result.status, PackStatus::Warning);
        assert_eq!(result.breakdown["big"].packed, 0);
        assert!(result.message.contains("Space limited"));
    }

    #[test]
    fn invalid_container_yields_error_status() {
        let container = Container {
            label: None,
            dims: (0.0, 2.352, 2.393),
            max_weight: 28200.0,
        };
        let cartons = vec![carton("box", (0.8, 0.6, 0.6), 25.0, 20)];

        let result = pack(&container, &cartons);

        assert_eq!(result.status, PackStatus::Error);
        assert!(result.placed_items.is_empty());
        assert!(result.message.contains("Invalid input"));
        assert_eq!(result.breakdown["box"].requested, 20);
        assert_eq!(result.breakdown["box"].packed, 0);
    }

    #[test]
    fn invalid_carton_yields_error_status() {
        let container = twenty_foot();
        let cartons = vec![CartonType {
            id: "bad".to_string(),
            name: "Bad".to_string(),
            dims: (0.8, -0.6, 0.6),
            weight: 25.0,
            quantity: 20,
            color: None,
        }];

        let result = pack(&container, &cartons);

        assert_eq!(result.status, PackStatus::Error);
        assert!(result.placed_items.is_empty());
    }

    #[test]
    fn ranking_prefers_footprint_then_weight() {
        let cartons = vec![
            carton("small", (0.4, 0.4, 0.4), 50.0, 1),
            carton("wide", (1.0, 1.0, 0.4), 5.0, 1),
            carton("heavy", (0.4, 0.4, 0.4), 80.0, 1),
        ];

        let order = rank_types(&cartons);

        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn ranking_is_stable_on_full_ties() {
        let cartons = vec![
            carton("first", (0.5, 0.5, 0.5), 10.0, 1),
            carton("second", (0.5, 0.5, 0.5), 10.0, 1),
            carton("third", (0.5, 0.5, 0.5), 10.0, 1),
        ];

        let order = rank_types(&cartons);

        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn identical_inputs_produce_identical_plans() {
        let container = twenty_foot();
        let cartons = vec![
            carton("pallet", (1.2, 0.8, 0.9), 320.0, 8),
            carton("crate", (0.6, 0.4, 0.4), 18.0, 40),
            carton("drum", (0.6, 0.6, 0.9), 95.0, 6),
        ];

        let first = pack(&container, &cartons);
        let second = pack(&container, &cartons);

        assert_eq!(first.placed_items, second.placed_items);
        assert_eq!(first.breakdown, second.breakdown);
        assert_eq!(first.status, second.status);
        assert_eq!(first.message, second.message);
    }

    #[test]
    fn mixed_types_satisfy_all_invariants() {
        let container = twenty_foot();
        let cartons = vec![
            carton("pallet", (1.2, 0.8, 0.9), 320.0, 8),
            carton("crate", (0.6, 0.4, 0.4), 18.0, 40),
            carton("drum", (0.6, 0.6, 0.9), 95.0, 6),
            carton("tall", (0.8, 0.8, 2.0), 130.0, 3),
        ];

        let result = pack(&container, &cartons);

        assert!(result.placed_count() > 0);
        assert_clean(&container, &cartons, &result);

        let packed_sum: u64 = result.breakdown.values().map(|b| b.packed as u64).sum();
        assert_eq!(packed_sum, result.placed_count() as u64);
        for entry in result.breakdown.values() {
            assert!(entry.packed <= entry.requested);
        }
    }

    #[test]
    fn heavier_broad_types_land_on_the_floor_shelf() {
        let container = Container::new(None, (2.0, 1.0, 2.0), 1000.0).unwrap();
        let cartons = vec![
            carton("light_small", (0.5, 0.5, 0.5), 5.0, 4),
            carton("heavy_broad", (1.0, 1.0, 0.5), 100.0, 2),
        ];

        let result = pack(&container, &cartons);

        // The broad type ranks first, so the first placements on the floor
        // shelf are its units.
        assert_eq!(result.placed_items[0].carton_id, "heavy_broad");
        assert_eq!(result.placed_items[0].position, (0.0, 0.0, 0.0));
        assert_eq!(result.placed_items[1].carton_id, "heavy_broad");
        assert_eq!(result.placed_items[1].position, (1.0, 0.0, 0.0));
        assert_clean(&container, &cartons, &result);
    }

    #[test]
    fn shelf_floors_match_tallest_item_of_previous_shelf() {
        let container = Container::new(None, (2.0, 1.0, 3.0), 1000.0).unwrap();
        let cartons = vec![
            carton("tall", (1.0, 1.0, 1.0), 10.0, 2),
            carton("short", (1.0, 1.0, 0.4), 5.0, 4),
        ];

        let result = pack(&container, &cartons);

        // Shelf 1 holds both tall units (footprint ties, weight wins), so
        // shelf 2 starts at z = 1.0 and shelf 3 at z = 1.4.
        let floors: Vec<f64> = result.placed_items.iter().map(|p| p.position.2).collect();
        for &z in &floors {
            assert!(
                [0.0, 1.0, 1.4]
                    .iter()
                    .any(|floor| (z - floor).abs() < EPSILON_HEIGHT),
                "unexpected floor {z}"
            );
        }
        assert!(floors.iter().any(|&z| (z - 1.4).abs() < EPSILON_HEIGHT));
        assert_clean(&container, &cartons, &result);
    }

    #[test]
    fn placement_cap_stops_the_run() {
        let container = twenty_foot();
        let cartons = vec![carton("box", (0.8, 0.6, 0.6), 25.0, 20)];
        let config = PackingConfig::builder().max_placements(5).build();

        let result = pack_with_config(&container, &cartons, config);

        assert_eq!(result.placed_count(), 5);
        assert_eq!(result.status, PackStatus::Warning);
    }

    #[test]
    fn progress_events_cover_every_placement() {
        let container = twenty_foot();
        let cartons = vec![carton("box", (0.8, 0.6, 0.6), 25.0, 20)];

        let mut shelves = 0usize;
        let mut placements = 0usize;
        let mut finished = None;
        let result = pack_with_progress(
            &container,
            &cartons,
            PackingConfig::default(),
            |event| match event {
                PackEvent::ShelfStarted { .. } => shelves += 1,
                PackEvent::ItemPlaced { .. } => placements += 1,
                PackEvent::Finished { placed, requested } => finished = Some((*placed, *requested)),
            },
        );

        assert_eq!(placements, result.placed_count());
        assert!(shelves >= 1);
        assert_eq!(finished, Some((20, 20)));
    }

    #[test]
    fn weight_check_is_global_across_shelves() {
        // Two shelves of geometry available, but the budget only covers three
        // units in total.
        let container = Container::new(None, (2.0, 1.0, 2.0), 35.0).unwrap();
        let cartons = vec![carton("box", (1.0, 1.0, 1.0), 10.0, 4)];

        let result = pack(&container, &cartons);

        assert_eq!(result.placed_count(), 3);
        assert!((result.total_weight - 30.0).abs() < EPSILON_GENERAL);
        assert_clean(&container, &cartons, &result);
    }

    #[test]
    fn audit_flags_tampered_plans() {
        let container = twenty_foot();
        let cartons = vec![carton("box", (0.8, 0.6, 0.6), 25.0, 4)];
        let mut result = pack(&container, &cartons);

        // Drag one unit outside the hull and onto another unit's space.
        result.placed_items[0].position = (5.5, 0.0, 0.0);
        let diagnostics = audit_plan(&container, &cartons, &result);
        assert_eq!(diagnostics.out_of_bounds, 1);
        assert!(!diagnostics.is_clean());

        result.placed_items[0].position = result.placed_items[1].position;
        let diagnostics = audit_plan(&container, &cartons, &result);
        assert!(diagnostics.overlapping_pairs > 0);
        assert!(!diagnostics.is_clean());
    }

    #[test]
    fn audit_flags_floating_floors() {
        let container = twenty_foot();
        let cartons = vec![carton("box", (0.8, 0.6, 0.6), 25.0, 2)];
        let mut result = pack(&container, &cartons);

        // Lift one unit to a height no shelf boundary produced.
        result.placed_items[1].position = (2.0, 0.0, 1.1);
        let diagnostics = audit_plan(&container, &cartons, &result);
        assert_eq!(diagnostics.unsupported, 1);
        assert!(!diagnostics.is_clean());
    }

    #[test]
    fn audit_counts_gap_rested_units_without_failing() {
        let container = Container::new(None, (2.0, 1.0, 3.0), 1000.0).unwrap();
        // Shelf 1: one tall and one short unit; shelf 2 sits on the tall
        // unit's top, leaving a gap above the short one.
        let cartons = vec![
            carton("tall", (1.0, 1.0, 1.0), 10.0, 1),
            carton("short", (1.0, 1.0, 0.4), 9.0, 3),
        ];

        let result = pack(&container, &cartons);
        let diagnostics = audit_plan(&container, &cartons, &result);

        assert!(diagnostics.is_clean());
        assert!(diagnostics.resting_on_gap > 0);
        assert_eq!(diagnostics.unsupported, 0);
    }

    #[test]
    fn validation_error_formats_offending_field() {
        let err = CartonType::new("c", "C", (1.0, 1.0, 1.0), -2.0, 1, None).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidWeight(_)));
        assert!(err.to_string().contains("'c'"));
    }
}
