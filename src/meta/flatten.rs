//! Flatten the nested file structures into a single [`MetadataMap`].
//!
//! Keys use the field names the decoding engine gives each value, so a map
//! built here lines up with what other tools built on the same engine report.
use super::{Attributes, Binaries, Experiment, FileMetadata, MetadataDesc, TextInfo};
use crate::params::MetadataMap;

pub fn flatten_attributes(attributes: &Attributes, map: &mut MetadataMap) {
    map.insert("uiWidth", attributes.width);
    map.insert("uiWidthBytes", attributes.width_bytes);
    map.insert("uiHeight", attributes.height);
    map.insert("uiComp", attributes.components);
    map.insert("uiBpcInMemory", attributes.bpc_in_memory);
    map.insert("uiBpcSignificant", attributes.bpc_significant);
    map.insert("uiSequenceCount", attributes.sequence_count);
    map.insert("uiTileWidth", attributes.tile_width);
    map.insert("uiTileHeight", attributes.tile_height);
    map.insert("uiCompression", attributes.compression.code());
    map.insert("uiQuality", attributes.quality);
}

pub fn flatten_description(description: &MetadataDesc, map: &mut MetadataMap) {
    map.insert("dTimeStart", description.time_start);
    map.insert("dAngle", description.angle);
    map.insert("dCalibration", description.calibration);
    map.insert("dAspect", description.aspect);
    map.insert("wszObjectiveName", description.objective_name.as_str());
    map.insert("dObjectiveMag", description.objective_magnification);
    map.insert("dObjectiveNA", description.objective_na);
    map.insert("dRefractIndex1", description.refractive_index1);
    map.insert("dRefractIndex2", description.refractive_index2);
    map.insert("dPinholeRadius", description.pinhole_radius);
    map.insert("dZoom", description.zoom);
    map.insert("dProjectiveMag", description.projective_magnification);
    map.insert("uiImageType", description.image_type.code());
    map.insert("uiComponentCount", description.component_count);
    map.insert("uiPlaneCount", description.planes.len() as u32);
    for (i, plane) in description.planes.iter().enumerate() {
        let summary = format!(
            "{{uiCompCount}}: {} {{uiColorRGB}}: {} {{dEmissionWL}}: {:?} {{wszName}}: {} {{wszOCName}}: {}",
            plane.component_count,
            plane.color.packed(),
            plane.emission_wavelength,
            plane.name,
            plane.oc_name
        );
        map.insert(format!("uiPlaneCountIndex_{i}"), summary);
    }
}

pub fn flatten_experiment(experiment: &Experiment, map: &mut MetadataMap) {
    map.insert("experimentDimension", experiment.len() as u32);
    for (i, level) in experiment.iter().enumerate() {
        let summary = format!(
            "{{uiExpType}}: {} {{uiLoopSize}}: {} {{dInterval}}: {:?}",
            level.kind.code(),
            level.loop_size,
            level.interval
        );
        map.insert(format!("experimentDimension_{i}"), summary);
    }
}

pub fn flatten_binaries(binaries: &Binaries, map: &mut MetadataMap) {
    map.insert("binaryLayers", binaries.len() as u32);
    for (i, binary) in binaries.iter().enumerate() {
        let summary = format!(
            "{{wszName}}: {} {{wszCompName}}: {} {{uiColorRGB}}: {}",
            binary.name,
            binary.component_name,
            binary.color.packed()
        );
        map.insert(format!("binaryLayer_{i}"), summary);
    }
}

/// Only the short fields are copied, the long text blocks are left to
/// [`mine_text_info`](super::mine_text_info).
pub fn flatten_text_info(text_info: &TextInfo, map: &mut MetadataMap) {
    for (key, value) in text_info.scalar_fields() {
        map.insert(key, value);
    }
}

/// Flatten every structure in `metadata` without mining the free text
pub fn flatten_structures(metadata: &FileMetadata) -> MetadataMap {
    let mut map = MetadataMap::new();
    flatten_attributes(&metadata.attributes, &mut map);
    flatten_description(&metadata.description, &mut map);
    flatten_experiment(&metadata.experiment, &mut map);
    flatten_binaries(&metadata.binaries, &mut map);
    flatten_text_info(&metadata.text_info, &mut map);
    map
}

/// Flatten every structure in `metadata`, then merge in the settings mined from
/// its free text. Mined keys replace structured ones they collide with.
pub fn flatten_metadata(metadata: &FileMetadata) -> MetadataMap {
    let mut map = flatten_structures(metadata);
    let n = super::mine_text_info(&metadata.text_info, &mut map);
    log::debug!("Flattened {} metadata entries, {n} mined from text", map.len());
    map
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::meta::{
        BinaryDescriptor, CompressionType, ExperimentLevel, LoopKind, PicturePlaneDesc, RgbColor,
    };
    use crate::params::Value;

    pub(crate) fn two_plane_fixture() -> FileMetadata {
        let attributes = Attributes {
            width: 5,
            width_bytes: 32,
            height: 4,
            components: 3,
            bpc_in_memory: 16,
            bpc_significant: 12,
            sequence_count: 12,
            tile_width: 0,
            tile_height: 0,
            compression: CompressionType::Lossless,
            quality: 100,
        };
        let description = MetadataDesc {
            time_start: 2457373.0,
            calibration: 0.16,
            aspect: 1.0,
            objective_name: "Plan Apo 60x Oil".into(),
            objective_magnification: 60.0,
            objective_na: 1.4,
            component_count: 3,
            planes: vec![
                PicturePlaneDesc {
                    component_count: 1,
                    color: RgbColor(0x00FF00),
                    name: "GFP".into(),
                    oc_name: "FITC".into(),
                    emission_wavelength: 520.0,
                },
                PicturePlaneDesc {
                    component_count: 2,
                    color: RgbColor(0x0000FF),
                    name: "mCherry".into(),
                    oc_name: "TRITC".into(),
                    emission_wavelength: 610.5,
                },
            ],
            ..Default::default()
        };
        let text_info = TextInfo {
            author: "jborbely".into(),
            date: "16/12/2015  10:00:00".into(),
            capturing: "Camera Name: Andor Zyla\nBinning: 1x1".into(),
            description: "Exposure: 100\nNumerical Aperture: 1.4".into(),
            ..Default::default()
        };
        let experiment = Experiment::new(vec![
            ExperimentLevel::new(LoopKind::Time, 3, 100.0),
            ExperimentLevel::new(LoopKind::Z, 4, 0.5),
        ]);
        let binaries = Binaries::new(vec![BinaryDescriptor::new(
            "Nuclei",
            "",
            RgbColor(0xFFFF00),
        )]);
        FileMetadata::new(attributes, text_info, description, experiment, binaries)
    }

    #[test_log::test]
    fn test_flatten_composites() {
        let metadata = two_plane_fixture();
        let map = flatten_structures(&metadata);

        let plane_keys: Vec<_> = map
            .keys()
            .filter(|k| k.starts_with("uiPlaneCountIndex_"))
            .collect();
        assert_eq!(plane_keys, ["uiPlaneCountIndex_0", "uiPlaneCountIndex_1"]);
        let binary_keys: Vec<_> = map.keys().filter(|k| k.starts_with("binaryLayer_")).collect();
        assert_eq!(binary_keys, ["binaryLayer_0"]);

        assert_eq!(
            map["uiPlaneCountIndex_0"],
            Value::String(
                "{uiCompCount}: 1 {uiColorRGB}: 65280 {dEmissionWL}: 520.0 {wszName}: GFP {wszOCName}: FITC"
                    .into()
            )
        );
        assert_eq!(
            map["experimentDimension_0"],
            Value::String("{uiExpType}: 0 {uiLoopSize}: 3 {dInterval}: 100.0".into())
        );
        assert_eq!(
            map["binaryLayer_0"],
            Value::String("{wszName}: Nuclei {wszCompName}:  {uiColorRGB}: 16776960".into())
        );
        assert_eq!(map["uiPlaneCount"], Value::Int(2));
        assert_eq!(map["binaryLayers"], Value::Int(1));
        assert_eq!(map["experimentDimension"], Value::Int(2));
    }

    #[test_log::test]
    fn test_flatten_scalars_sorted() {
        let metadata = two_plane_fixture();
        let map = flatten_structures(&metadata);
        // 11 attributes, 15 description scalars + 2 planes, 1 + 2 experiment,
        // 1 + 1 binaries, 12 text fields
        assert_eq!(map.len(), 11 + 17 + 3 + 2 + 12);
        assert_eq!(map["uiWidth"], Value::Int(5));
        assert_eq!(map["uiCompression"], Value::Int(0));
        assert_eq!(map["dObjectiveNA"], Value::Float(1.4));
        assert_eq!(map["wszAuthor"], Value::String("jborbely".into()));
        assert_eq!(map["wszObjectiveName"], Value::String("Plan Apo 60x Oil".into()));

        let keys: Vec<_> = map.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test_log::test]
    fn test_flatten_with_mined_text() {
        let metadata = two_plane_fixture();
        let map = flatten_metadata(&metadata);
        assert_eq!(map.len(), 45 + 4);
        assert_eq!(map["Camera Name"], Value::String("Andor Zyla".into()));
        assert_eq!(map["Exposure"], Value::Int(100));
        assert_eq!(map["Numerical Aperture"], Value::Float(1.4));
        assert_eq!(map.get_index(0).map(|(k, _)| k), Some("Binning"));
    }
}
