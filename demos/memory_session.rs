use std::io;

use nd2data::io::{MemoryEngine, MemoryFile};
use nd2data::meta::{
    Attributes, Binaries, Experiment, ExperimentLevel, FileMetadata, LocalMetadata, LoopKind,
    MetadataDesc, PicturePlaneDesc, RgbColor, TextInfo,
};
use nd2data::prelude::*;

const PATH: &str = "synthetic.nd2";

fn synthetic_file() -> MemoryFile {
    let (width, height) = (6, 4);
    let attributes = Attributes {
        width,
        height,
        width_bytes: 12,
        components: 1,
        bpc_in_memory: 16,
        bpc_significant: 12,
        sequence_count: 6,
        ..Default::default()
    };
    let description = MetadataDesc {
        calibration: 0.32,
        component_count: 1,
        objective_name: "Plan Fluor 20x".into(),
        planes: vec![PicturePlaneDesc {
            component_count: 1,
            color: RgbColor(0x00FF00),
            name: "GFP".into(),
            oc_name: "FITC".into(),
            emission_wavelength: 510.0,
        }],
        ..Default::default()
    };
    let text_info = TextInfo {
        capturing: "Camera Name: Synthetic\nExposure:\t50 ms\nBinning: 1x1".into(),
        description: "Objective\tName: Plan Fluor 20x\n Numerical Aperture: 0.75".into(),
        ..Default::default()
    };
    let experiment = Experiment::new(vec![
        ExperimentLevel::new(LoopKind::Time, 3, 500.0),
        ExperimentLevel::new(LoopKind::Z, 2, 1.0),
    ]);
    let metadata = FileMetadata::new(
        attributes,
        text_info,
        description,
        experiment,
        Binaries::default(),
    );

    let layout = PictureLayout::from_attributes(&metadata.attributes);
    let mut file = MemoryFile::new(metadata);
    for seq in 0..6u32 {
        let mut data = vec![0u8; layout.size];
        for y in 0..height {
            for x in 0..width {
                if let Some(offset) = layout.offset_of(x, y, 0) {
                    let value = (seq * 100 + y * width + x) as u16;
                    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
                }
            }
        }
        let local = LocalMetadata::new(
            (seq / 2) as f64 * 500.0,
            120.0,
            -40.0,
            (seq % 2) as f64,
        );
        file = file.with_frame(data, local);
    }
    file
}

fn main() -> io::Result<()> {
    env_logger::init();
    let mut reader = Nd2Reader::new(MemoryEngine::new().with_file(PATH, synthetic_file()));
    reader.open(PATH)?;

    println!("------ Metadata -------");
    for (key, value) in reader.metadata()?.iter() {
        println!("{key}: {value}");
    }

    println!("------- SeqIndex -------");
    let coords = ExperimentCoordinates::new(1, 0, 1, 0);
    let index = reader.seq_index_from_coords(&coords)?;
    println!("{coords} -> {index} -> {}", reader.coords_from_seq_index(index)?);

    println!("----- Sequence Info ----");
    for seq in 0..reader.len() {
        let frame = reader.read_sequence(seq)?;
        let row = frame.picture.row_as::<u16>(0).map_err(Nd2Error::from)?;
        println!(
            "SeqIndex= {seq}; T[sec]= {:.3}; Z= {:.3}; first row: {:?}",
            frame.local.time_seconds(),
            frame.local.z_pos,
            row
        );
    }

    reader.close()?;
    Ok(())
}
