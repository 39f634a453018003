use std::io;
use std::path::PathBuf;

use clap::Parser;

use nd2data::io::nd2sdk::{Nd2SdkLibrary, SdkEngine};
use nd2data::prelude::*;

/// Print the metadata of an ND2 file and the timestamp and stage position of
/// every sequence in it
#[derive(Debug, Parser)]
struct App {
    /// The ND2 file to read
    path: PathBuf,

    /// The nd2ReadSDK shared library to load instead of the default
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Print the sample range of each channel as well
    #[arg(short = 's', long)]
    channel_stats: bool,
}

fn main() -> io::Result<()> {
    env_logger::init();
    let args = App::parse();

    let library = match args.library.as_ref() {
        Some(path) => Nd2SdkLibrary::load_from(path)?,
        None => Nd2SdkLibrary::load()?,
    };
    let mut reader = Nd2Reader::new(SdkEngine::new(library));
    reader.open(&args.path)?;

    println!("------ Metadata -------");
    for (key, value) in reader.metadata()?.iter() {
        println!("{key}: {value}");
    }

    println!("------- SeqIndex -------");
    let coords = ExperimentCoordinates::new(1, 0, 0, 0);
    match reader.seq_index_from_coords(&coords) {
        Ok(index) => {
            println!("{coords} -> {index}");
            let back = reader.coords_from_seq_index(index)?;
            println!("{index} -> {back}");
        }
        Err(e) => println!("{coords}: {e}"),
    }

    if let Some(dims) = reader.dimensions().copied() {
        println!(
            "{} x {} pixels, {} channels, {} slices, {} frames (hyperstack: {})",
            dims.width,
            dims.height,
            dims.channels,
            dims.slices,
            dims.frames,
            dims.is_hyperstack(reader.len() as u32)
        );
    }

    println!("----- Sequence Info ----");
    for seq in 0..reader.len() {
        let frame = reader.read_sequence(seq)?;
        let local = frame.local;
        println!(
            "SeqIndex= {seq}; T[sec]= {:.3}; X= {:.3}; Y= {:.3}; Z= {:.3}",
            local.time_seconds(),
            local.x_pos,
            local.y_pos,
            local.z_pos
        );
        if args.channel_stats {
            for c in 0..frame.picture.layout().components {
                let plane = frame.picture.channel(c).map_err(Nd2Error::from)?;
                let lo = plane.iter().min().copied().unwrap_or_default();
                let hi = plane.iter().max().copied().unwrap_or_default();
                println!("\tchannel {c}: {lo}..={hi}");
            }
        }
    }

    reader.close()?;
    Ok(())
}
