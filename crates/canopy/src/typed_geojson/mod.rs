use std::marker::PhantomData;

use geojson::{FeatureCollection, Geometry, JsonObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Attributes of one canopy polygon, named as they appear in the exported layer
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[schemars(description = "Attributes of a detected tree canopy polygon")]
pub struct CanopyProperties {
    #[serde(rename = "ID")]
    #[schemars(description = "Dense 1-based identifier in detection order")]
    pub id: u32,
    #[serde(rename = "Area_px")]
    #[schemars(description = "Enclosed area of the traced boundary in square pixels")]
    pub area_px: u64,
}

pub type CanopyFeatureCollection = TypedFeatureCollection<CanopyProperties>;

/// A GeoJSON Feature whose properties deserialize into `P`.
#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeature<P> {
    #[serde(flatten)]
    pub feature: geojson::Feature,
    #[serde(skip)]
    _properties: PhantomData<P>,
}

impl<P> TypedFeature<P>
where
    for<'de> P: Serialize + Deserialize<'de>,
{
    pub fn new(geometry: Option<Geometry>, properties: P) -> Self {
        let feature = geojson::Feature {
            bbox: None,
            geometry,
            id: None,
            properties: serde_json::to_value(properties).ok().and_then(|v| v.as_object().cloned()),
            foreign_members: None,
        };
        Self {
            feature,
            _properties: PhantomData,
        }
    }

    pub fn with_id(mut self, id: geojson::feature::Id) -> Self {
        self.feature.id = Some(id);
        self
    }

    /// Typed view of the properties, `None` if they don't match `P`.
    pub fn properties(&self) -> Option<P> {
        self.feature
            .properties
            .as_ref()
            .and_then(|p| serde_json::from_value(serde_json::Value::Object(p.clone())).ok())
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeatureCollection<P> {
    pub bbox: Option<Vec<f64>>,
    pub features: Vec<TypedFeature<P>>,
    pub foreign_members: Option<JsonObject>,
}

impl<P> TypedFeatureCollection<P> {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[TypedFeature<P>] {
        &self.features
    }

    /// Plain GeoJSON collection, ready to serialize as a standard document
    pub fn into_feature_collection(self) -> FeatureCollection {
        FeatureCollection {
            bbox: self.bbox,
            features: self.features.into_iter().map(|f| f.feature).collect(),
            foreign_members: self.foreign_members,
        }
    }

    fn foreign_member(&self, key: &str) -> Option<&serde_json::Value> {
        self.foreign_members.as_ref().and_then(|foreign| foreign.get(key))
    }
}

impl CanopyFeatureCollection {
    /// Look a canopy up by its `ID`
    pub fn feature_by_id(&self, id: u32) -> Option<&TypedFeature<CanopyProperties>> {
        self.features
            .iter()
            .find(|feature| feature.properties().is_some_and(|props| props.id == id))
    }

    /// Features whose pixel area lies in `min_area..=max_area`
    pub fn features_by_area_range(&self, min_area: u64, max_area: u64) -> Vec<&TypedFeature<CanopyProperties>> {
        self.features
            .iter()
            .filter(|feature| {
                feature
                    .properties()
                    .is_some_and(|props| (min_area..=max_area).contains(&props.area_px))
            })
            .collect()
    }

    /// Get the largest canopy by area; ties go to the lowest `ID`.
    pub fn largest_feature(&self) -> Option<&TypedFeature<CanopyProperties>> {
        self.features
            .iter()
            .filter_map(|feature| feature.properties().map(|props| (feature, props)))
            .max_by(|(_, a), (_, b)| a.area_px.cmp(&b.area_px).then(b.id.cmp(&a.id)))
            .map(|(feature, _)| feature)
    }

    pub fn crs(&self) -> Option<&str> {
        self.foreign_member("crs")?.as_str()
    }

    pub fn threshold(&self) -> Option<u8> {
        self.foreign_member("threshold")?
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
    }

    pub fn polygon_count(&self) -> Option<usize> {
        self.foreign_member("polygon_count")?
            .as_u64()
            .map(|v| v as usize)
    }
}
