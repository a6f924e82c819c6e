use std::path::Path;

use geo_types::{LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value, feature::Id};
use serde_json::Number;

use crate::{
    error::Result,
    types::{AoiGeometry, CanopyPolygon, Crs, SegmentationResult},
    typed_geojson::{CanopyFeatureCollection, CanopyProperties, TypedFeature, TypedFeatureCollection},
};

/// Attribute names carried by every exported canopy feature
pub const ID_PROPERTY: &str = "ID";
pub const AREA_PROPERTY: &str = "Area_px";

impl CanopyPolygon {
    /// GeoJSON polygon geometry; the ring is closed on output.
    pub fn to_geojson_geometry(&self) -> Geometry {
        let mut ring: Vec<Vec<f64>> = self.ring.iter().map(|&[x, y]| vec![x, y]).collect();
        if let Some(first) = ring.first().cloned() {
            ring.push(first);
        }
        Geometry::new(Value::Polygon(vec![ring]))
    }
}

impl SegmentationResult {
    /// Export to typed GeoJSON format
    pub fn to_typed_geojson(&self) -> CanopyFeatureCollection {
        let features = self
            .polygons
            .iter()
            .map(|polygon| {
                let properties = CanopyProperties {
                    id: polygon.id,
                    area_px: polygon.area_px,
                };
                TypedFeature::new(Some(polygon.to_geojson_geometry()), properties)
                    .with_id(Id::Number(Number::from(polygon.id)))
            })
            .collect();

        TypedFeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(self.metadata()),
        }
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .polygons
            .iter()
            .map(|polygon| {
                let mut properties = JsonObject::new();
                properties.insert(ID_PROPERTY.to_string(), serde_json::Value::Number(Number::from(polygon.id)));
                properties.insert(AREA_PROPERTY.to_string(), serde_json::Value::Number(Number::from(polygon.area_px)));

                Feature {
                    bbox: None,
                    geometry: Some(polygon.to_geojson_geometry()),
                    id: Some(Id::Number(Number::from(polygon.id))),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(self.metadata()),
        }
    }

    /// Export to GeoJSON and serialize to JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    /// Save GeoJSON to file
    pub fn save_geojson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }

    fn metadata(&self) -> JsonObject {
        let mut foreign_members = JsonObject::new();
        foreign_members.insert("crs".to_string(), serde_json::Value::String(self.crs.to_string()));
        foreign_members.insert("threshold".to_string(), serde_json::Value::Number(Number::from(self.threshold)));
        foreign_members.insert("polygon_count".to_string(), serde_json::Value::Number(Number::from(self.polygons.len())));
        foreign_members
    }
}

impl AoiGeometry {
    /// Collect every `Polygon` and `MultiPolygon` in a GeoJSON document.
    ///
    /// Other geometry types are skipped; GeoJSON carries no CRS of its own
    /// here, so the caller declares it.
    pub fn from_geojson_str(geojson_str: &str, crs: Crs) -> Result<Self> {
        let geojson: GeoJson = geojson_str.parse()?;
        let mut polygons = Vec::new();

        match geojson {
            GeoJson::FeatureCollection(collection) => {
                for feature in collection.features {
                    if let Some(geometry) = feature.geometry {
                        collect_polygons(&geometry.value, &mut polygons);
                    }
                }
            }
            GeoJson::Feature(feature) => {
                if let Some(geometry) = feature.geometry {
                    collect_polygons(&geometry.value, &mut polygons);
                }
            }
            GeoJson::Geometry(geometry) => collect_polygons(&geometry.value, &mut polygons),
        }

        Ok(Self::new(MultiPolygon::new(polygons), crs))
    }

    pub fn from_geojson_file<P: AsRef<Path>>(path: P, crs: Crs) -> Result<Self> {
        let geojson_str = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&geojson_str, crs)
    }
}

fn collect_polygons(value: &Value, polygons: &mut Vec<Polygon<f64>>) {
    match value {
        Value::Polygon(rings) => polygons.extend(polygon_from_rings(rings)),
        Value::MultiPolygon(parts) => polygons.extend(parts.iter().filter_map(|rings| polygon_from_rings(rings))),
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_polygons(&geometry.value, polygons);
            }
        }
        _ => {}
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        LineString::from(
            ring.iter()
                .filter(|position| position.len() >= 2)
                .map(|position| (position[0], position[1]))
                .collect::<Vec<_>>(),
        )
    });
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AoiSource;

    fn result() -> SegmentationResult {
        SegmentationResult {
            polygons: vec![
                CanopyPolygon { id: 1, area_px: 4, ring: vec![[0.5, 9.5], [0.5, 7.5], [2.5, 7.5], [2.5, 9.5]] },
                CanopyPolygon { id: 2, area_px: 1, ring: vec![[5.5, 4.5], [5.5, 3.5], [6.5, 3.5]] },
            ],
            crs: Crs::epsg(25830),
            threshold: 97,
            raster_width: 10,
            raster_height: 10,
        }
    }

    #[test]
    fn features_carry_id_and_area() {
        let collection = result().to_geojson();
        assert_eq!(collection.features.len(), 2);

        let properties = collection.features[1].properties.as_ref().unwrap();
        assert_eq!(properties[ID_PROPERTY], 2);
        assert_eq!(properties[AREA_PROPERTY], 1);

        let members = collection.foreign_members.as_ref().unwrap();
        assert_eq!(members["crs"], "EPSG:25830");
        assert_eq!(members["threshold"], 97);
        assert_eq!(members["polygon_count"], 2);
    }

    #[test]
    fn typed_export_mirrors_plain_export() {
        let plain = result().to_geojson();
        let typed = result().to_typed_geojson();
        assert_eq!(typed.len(), plain.features.len());

        for (typed, plain) in typed.features().iter().zip(&plain.features) {
            assert_eq!(typed.feature.id, plain.id);
            assert_eq!(typed.feature.properties, plain.properties);
            assert_eq!(typed.feature.geometry, plain.geometry);
        }
        assert_eq!(typed.features()[1].feature.id, Some(Id::Number(Number::from(2))));
    }

    #[test]
    fn exported_rings_are_closed() {
        let collection = result().to_geojson();
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        match &geometry.value {
            Value::Polygon(rings) => {
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0].first(), rings[0].last());
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn save_writes_parseable_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canopies.geojson");
        result().save_geojson(&path).unwrap();

        let written: GeoJson = std::fs::read_to_string(&path).unwrap().parse().unwrap();
        match written {
            GeoJson::FeatureCollection(fc) => assert_eq!(fc.features.len(), 2),
            other => panic!("expected feature collection, got {other:?}"),
        }
    }

    #[test]
    fn aoi_from_feature_collection() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [
                    [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                    [[4, 4], [6, 4], [6, 6], [4, 6], [4, 4]]
                 ]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[20, 20], [30, 20], [30, 30], [20, 20]]],
                    [[[40, 40], [50, 40], [50, 50], [40, 40]]]
                 ]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [1, 1]}}
            ]
        }"#;
        let aoi = AoiGeometry::from_geojson_str(doc, Crs::epsg(25830)).unwrap();
        assert_eq!(aoi.polygons.0.len(), 3);
        assert_eq!(aoi.rings().unwrap().len(), 4);
        assert_eq!(aoi.crs(), &Crs::epsg(25830));
    }

    #[test]
    fn aoi_from_bare_geometry() {
        let doc = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#;
        let aoi = AoiGeometry::from_geojson_str(doc, Crs::epsg(4326)).unwrap();
        assert_eq!(aoi.polygons.0.len(), 1);
    }

    #[test]
    fn invalid_document_is_an_error() {
        assert!(AoiGeometry::from_geojson_str("{\"type\": \"Nope\"}", Crs::epsg(4326)).is_err());
    }
}
