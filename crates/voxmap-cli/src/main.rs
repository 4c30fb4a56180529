mod args;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use voxmap_render::{ColorMap, RenderError, TileGenerator};

use crate::args::{Action, Cli, Parsed};

const COLORS_FILE: &str = "colors.txt";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match args::parse(std::env::args().skip(1)) {
        Ok(Parsed::Run(cli)) => cli,
        Ok(Parsed::Help) => {
            eprint!("{}", args::usage());
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{e}\n");
            eprint!("{}", args::usage());
            process::exit(1);
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), RenderError> {
    match cli.action {
        Action::PrintExtent => {
            let generator = TileGenerator::new(cli.options, ColorMap::default());
            let extent = generator.print_extent(&cli.input)?;
            println!("Map extent: {extent}");
        }
        Action::DumpBlock(pos) => {
            let generator = TileGenerator::new(cli.options, ColorMap::default());
            match generator.dump_block(&cli.input, pos)? {
                Some(hex) => println!("{hex}"),
                None => log::warn!("No block stored at {pos}"),
            }
        }
        Action::Render { output } => {
            let colors_path = cli.colors.unwrap_or_else(|| search_colors(&cli.input));
            let colors = ColorMap::load(&colors_path)?;
            log::debug!("Loaded {} colors from {}", colors.len(), colors_path.display());
            TileGenerator::new(cli.options, colors).generate(&cli.input, &output)?;
        }
    }
    Ok(())
}

/// Find a color table: the world's own, then the user's, then the working directory's.
fn search_colors(world: &Path) -> PathBuf {
    let in_world = world.join(COLORS_FILE);
    if in_world.is_file() {
        return in_world;
    }
    if let Some(home) = std::env::var_os("HOME") {
        let in_home = Path::new(&home).join(".minetest").join(COLORS_FILE);
        if in_home.is_file() {
            return in_home;
        }
    }
    log::warn!("Falling back to using {COLORS_FILE} from current directory");
    PathBuf::from(COLORS_FILE)
}
