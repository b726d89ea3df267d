//! Data models for the container load planning core.
//!
//! This module defines the fundamental data structures for cargo loading:
//! - `Container`: The loading space with dimensions and a payload weight limit
//! - `CartonType`: One SKU to be packed, with dimensions, weight and quantity
//! - `PlacedItem`: One packed unit with its position in the container
//! - `PackingResult`: The full outcome of a packing run
//!
//! All structures implement the traits from the `types` module where applicable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::types::{Dimensional, Positioned, Vec3, Weighted};

/// Display color applied to placements whose carton type has no color assigned.
pub const DEFAULT_ITEM_COLOR: &str = "#3b82f6";

/// Validation error for input data.
#[derive(Debug, Clone)]
pub enum ValidationError {
    InvalidDimension(String),
    InvalidWeight(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::InvalidWeight(msg) => write!(f, "Invalid weight: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Helper function to validate a single dimension.
fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Helper function to validate a weight value.
fn validate_weight_value(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates the three dimensions of a 3D extent together.
fn validate_dims(dims: (f64, f64, f64), what: &str) -> Result<(), ValidationError> {
    validate_dimension(dims.0, &format!("{} length", what))?;
    validate_dimension(dims.1, &format!("{} width", what))?;
    validate_dimension(dims.2, &format!("{} height", what))?;
    Ok(())
}

/// Represents the loading space: a rectangular container with a weight limit.
///
/// The container origin is at (0, 0, 0) and it is axis-aligned: X spans the
/// length, Y the width, Z the height.
///
/// # Fields
/// * `label` - Optional display name (e.g. "20' Standard")
/// * `dims` - Dimensions (length, width, height) in meters
/// * `max_weight` - Maximum payload weight in kg
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Container {
    pub label: Option<String>,
    #[schema(value_type = [f64; 3], example = json!([5.898, 2.352, 2.393]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
}

impl Container {
    /// Creates a new container with validation.
    ///
    /// # Parameters
    /// * `label` - Optional display name
    /// * `dims` - Dimensions (length, width, height)
    /// * `max_weight` - Maximum payload weight in kg
    ///
    /// # Returns
    /// `Ok(Container)` for valid values, otherwise `Err(ValidationError)`
    pub fn new(
        label: Option<String>,
        dims: (f64, f64, f64),
        max_weight: f64,
    ) -> Result<Self, ValidationError> {
        let container = Self {
            label,
            dims,
            max_weight,
        };
        container.validate()?;
        Ok(container)
    }

    /// Validates the container fields.
    ///
    /// Public so the packing engine can check preconditions on containers
    /// constructed directly from public fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dims(self.dims, "Container")?;
        validate_weight_value(self.max_weight, "Container max weight")?;
        Ok(())
    }

    /// The standard ISO container presets offered to callers.
    pub fn standard_presets() -> Vec<Self> {
        vec![
            Self {
                label: Some("20' Standard".to_string()),
                dims: (5.898, 2.352, 2.393),
                max_weight: 28200.0,
            },
            Self {
                label: Some("40' Standard".to_string()),
                dims: (12.032, 2.352, 2.393),
                max_weight: 26680.0,
            },
            Self {
                label: Some("40' High Cube".to_string()),
                dims: (12.032, 2.352, 2.698),
                max_weight: 28480.0,
            },
        ]
    }

    /// Converts the container dimensions to a Vec3.
    #[inline]
    pub fn dims_as_vec3(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Vec3 {
        self.dims_as_vec3()
    }
}

/// Represents one carton type (SKU) to be packed.
///
/// All `quantity` units of a type are identical; there is no per-unit
/// variation and units are never rotated.
///
/// # Fields
/// * `id` - Identifier referenced by placements and the breakdown
/// * `name` - Display name
/// * `dims` - Dimensions (length, width, height) of one unit in meters
/// * `weight` - Weight of one unit in kg
/// * `quantity` - Requested number of units
/// * `color` - Optional display color (hex string)
///
/// # Examples
/// ```
/// use stowplan::model::CartonType;
///
/// let carton = CartonType::new("c1", "Euro pallet box", (0.8, 0.6, 0.6), 25.0, 20, None);
/// assert!(carton.is_ok());
///
/// let invalid = CartonType::new("c2", "Flat pack", (0.8, -0.6, 0.6), 25.0, 20, None);
/// assert!(invalid.is_err());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CartonType {
    pub id: String,
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([0.8, 0.6, 0.6]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
    pub quantity: u32,
    #[serde(default)]
    #[schema(nullable = true, example = "#f97316")]
    pub color: Option<String>,
}

impl CartonType {
    /// Creates a new carton type with validation.
    ///
    /// # Parameters
    /// * `id` - Identifier
    /// * `name` - Display name
    /// * `dims` - Dimensions (length, width, height) of one unit
    /// * `weight` - Weight of one unit in kg
    /// * `quantity` - Requested number of units
    /// * `color` - Optional display color
    ///
    /// # Returns
    /// `Ok(CartonType)` for valid values, otherwise `Err(ValidationError)`
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        dims: (f64, f64, f64),
        weight: f64,
        quantity: u32,
        color: Option<String>,
    ) -> Result<Self, ValidationError> {
        let carton = Self {
            id: id.into(),
            name: name.into(),
            dims,
            weight,
            quantity,
            color,
        };
        carton.validate()?;
        Ok(carton)
    }

    /// Validates the carton fields.
    ///
    /// Public so the packing engine can check preconditions on cartons
    /// constructed directly from public fields. A zero quantity is valid:
    /// it simply requests nothing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dims(self.dims, &format!("Carton '{}'", self.id))?;
        validate_weight_value(self.weight, &format!("Carton '{}' weight", self.id))?;
        Ok(())
    }

    /// The display color for placements of this type.
    pub fn display_color(&self) -> String {
        self.color
            .clone()
            .unwrap_or_else(|| DEFAULT_ITEM_COLOR.to_string())
    }

    /// Converts the dimensions to a Vec3.
    #[inline]
    pub fn dims_as_vec3(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}

impl Dimensional for CartonType {
    fn dimensions(&self) -> Vec3 {
        self.dims_as_vec3()
    }
}

impl Weighted for CartonType {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// One packed unit with its position in the container.
///
/// The position is the corner of the unit nearest the container origin. The
/// extent is implicit from the referenced carton type's dimensions.
///
/// # Fields
/// * `carton_id` - Identifier of the carton type this unit belongs to
/// * `position` - Position (x, y, z) in the container
/// * `color` - Display color copied from the carton type
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PlacedItem {
    pub carton_id: String,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub position: (f64, f64, f64),
    pub color: String,
}

impl PlacedItem {
    /// Converts the position to a Vec3.
    #[inline]
    pub fn position_vec3(&self) -> Vec3 {
        Vec3::from_tuple(self.position)
    }
}

impl Positioned for PlacedItem {
    fn position(&self) -> Vec3 {
        self.position_vec3()
    }
}

/// Outcome classification of a packing run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PackStatus {
    /// Every requested unit was placed.
    Success,
    /// At least one requested unit could not be placed.
    Warning,
    /// The inputs were invalid; nothing was placed.
    Error,
}

/// Packed versus requested unit counts for one carton type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct TypeBreakdown {
    pub packed: u32,
    pub requested: u32,
}

/// The full outcome of one packing run.
///
/// # Fields
/// * `placed_items` - Placements in placement order (not spatially meaningful)
/// * `total_weight` - Cumulative weight of all placed units in kg
/// * `volume_utilization` - Placed volume as a percentage of container volume
/// * `weight_utilization` - Placed weight as a percentage of the weight limit
/// * `status` - Outcome classification
/// * `message` - Human-readable summary
/// * `breakdown` - Per-type packed/requested counts, keyed by carton id
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PackingResult {
    pub placed_items: Vec<PlacedItem>,
    pub total_weight: f64,
    pub volume_utilization: f64,
    pub weight_utilization: f64,
    pub status: PackStatus,
    pub message: String,
    pub breakdown: BTreeMap<String, TypeBreakdown>,
}

impl PackingResult {
    /// Indicates whether every requested unit was placed.
    pub fn is_complete(&self) -> bool {
        self.status == PackStatus::Success
    }

    /// Returns the number of placed units.
    pub fn placed_count(&self) -> usize {
        self.placed_items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_rejects_non_positive_dimensions() {
        assert!(Container::new(None, (0.0, 2.0, 2.0), 100.0).is_err());
        assert!(Container::new(None, (2.0, -1.0, 2.0), 100.0).is_err());
        assert!(Container::new(None, (2.0, 2.0, f64::NAN), 100.0).is_err());
        assert!(Container::new(None, (2.0, 2.0, 2.0), 100.0).is_ok());
    }

    #[test]
    fn container_rejects_non_positive_weight_limit() {
        assert!(Container::new(None, (2.0, 2.0, 2.0), 0.0).is_err());
        assert!(Container::new(None, (2.0, 2.0, 2.0), -5.0).is_err());
        assert!(Container::new(None, (2.0, 2.0, 2.0), f64::INFINITY).is_err());
    }

    #[test]
    fn carton_rejects_invalid_values() {
        assert!(CartonType::new("a", "A", (1.0, 1.0, 0.0), 1.0, 1, None).is_err());
        assert!(CartonType::new("a", "A", (1.0, 1.0, 1.0), -1.0, 1, None).is_err());
        assert!(CartonType::new("a", "A", (1.0, 1.0, 1.0), 1.0, 0, None).is_ok());
    }

    #[test]
    fn carton_display_color_falls_back_to_default() {
        let plain = CartonType::new("a", "A", (1.0, 1.0, 1.0), 1.0, 1, None).unwrap();
        let tinted =
            CartonType::new("b", "B", (1.0, 1.0, 1.0), 1.0, 1, Some("#ff0000".to_string()))
                .unwrap();

        assert_eq!(plain.display_color(), DEFAULT_ITEM_COLOR);
        assert_eq!(tinted.display_color(), "#ff0000");
    }

    #[test]
    fn standard_presets_are_valid() {
        let presets = Container::standard_presets();
        assert_eq!(presets.len(), 3);
        for preset in &presets {
            assert!(preset.validate().is_ok(), "preset {:?} invalid", preset.label);
        }
    }

    #[test]
    fn carton_deserializes_without_color() {
        let json = r#"{
            "id": "c1",
            "name": "Box",
            "dims": [0.8, 0.6, 0.6],
            "weight": 25.0,
            "quantity": 20
        }"#;
        let carton: CartonType = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(carton.color, None);
        assert_eq!(carton.quantity, 20);
    }

    #[test]
    fn pack_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PackStatus::Success).unwrap(),
            "\"success\""
        );
        assert_eq!(
            serde_json::to_string(&PackStatus::Warning).unwrap(),
            "\"warning\""
        );
        assert_eq!(
            serde_json::to_string(&PackStatus::Error).unwrap(),
            "\"error\""
        );
    }
}
