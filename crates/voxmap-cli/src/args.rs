//! Command-line parsing.

use std::path::PathBuf;

use voxmap_core::{BlockPos, Color, Geometry, HeightRange};
use voxmap_render::{RenderOptions, Scales};
use voxmap_world::{supported_backends, BackendKind, ExhaustiveMode};

#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    #[error("missing value for {0}")]
    MissingValue(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),

    #[error("invalid value '{value}' for {flag}: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },

    #[error("an input world is required (-i <world_path>)")]
    MissingInput,

    #[error("an output image is required (-o <output_image.png>)")]
    MissingOutput,
}

/// What the invocation asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Render { output: PathBuf },
    PrintExtent,
    DumpBlock(BlockPos),
}

#[derive(Debug, Clone)]
pub struct Cli {
    pub input: PathBuf,
    pub colors: Option<PathBuf>,
    pub action: Action,
    pub options: RenderOptions,
}

/// Result of parsing: either a run or a request for the usage text.
#[derive(Debug, Clone)]
pub enum Parsed {
    Run(Cli),
    Help,
}

const OPTIONS: &[(&str, &str)] = &[
    ("-i/--input", "<world_path>"),
    ("-o/--output", "<output_image.png>"),
    ("--bgcolor", "<color>"),
    ("--scalecolor", "<color>"),
    ("--playercolor", "<color>"),
    ("--origincolor", "<color>"),
    ("--poicolor", "<color>"),
    ("--drawscale", ""),
    ("--drawplayers", ""),
    ("--draworigin", ""),
    ("--drawpois", ""),
    ("--drawalpha", ""),
    ("--noshading", ""),
    ("--noemptyimage", ""),
    ("--min-y", "<y>"),
    ("--max-y", "<y>"),
    ("--backend", "<backend>"),
    ("--geometry", "x:y+w+h"),
    ("--extent", ""),
    ("--zoom", "<zoomlevel>"),
    ("--colors", "<colors.txt>"),
    ("--scales", "[t][b][l][r]"),
    ("--exhaustive", "never|y|full|auto"),
    ("--dumpblock", "x,y,z"),
];

pub fn usage() -> String {
    let mut text = String::from(
        "voxmap -i <world_path> -o <output_image.png> [options]\n\
         Generate an overview image of a voxel world map.\n\nOptions:\n",
    );
    for (flag, value) in OPTIONS {
        text.push_str(&format!("  {flag:<18}{value}\n"));
    }
    text.push_str("\nColor format: hexadecimal '#RRGGBB', e.g. '#FF0000' = red\n");
    text.push_str(&format!("Supported backends: {}\n", supported_backends().join(" ")));
    text
}

fn invalid(flag: &str, value: &str, reason: impl ToString) -> ArgsError {
    ArgsError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_color(flag: &str, value: &str) -> Result<Color, ArgsError> {
    Color::parse_hex(value).map_err(|e| invalid(flag, value, e))
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, ArgsError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| invalid(flag, value, e))
}

/// Parse arguments, excluding the program name.
pub fn parse<I, S>(args: I) -> Result<Parsed, ArgsError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut colors: Option<PathBuf> = None;
    let mut print_extent = false;
    let mut dump_block: Option<BlockPos> = None;
    let mut min_y: Option<i32> = None;
    let mut max_y: Option<i32> = None;
    let mut options = RenderOptions::default();

    while let Some(arg) = args.next() {
        // `--flag=value` is accepted as well as `--flag value`.
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = || -> Result<String, ArgsError> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => args.next().ok_or_else(|| ArgsError::MissingValue(flag.clone())),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => return Ok(Parsed::Help),
            "-i" | "--input" => input = Some(PathBuf::from(value()?)),
            "-o" | "--output" => output = Some(PathBuf::from(value()?)),
            "--bgcolor" => options.background = parse_color(&flag, &value()?)?,
            "--scalecolor" => options.scale_color = parse_color(&flag, &value()?)?,
            "--playercolor" => options.player_color = parse_color(&flag, &value()?)?,
            "--origincolor" => options.origin_color = parse_color(&flag, &value()?)?,
            "--poicolor" => options.poi_color = parse_color(&flag, &value()?)?,
            "--drawscale" => options.draw_scale = true,
            "--drawplayers" => options.draw_players = true,
            "--draworigin" => options.draw_origin = true,
            "--drawpois" => options.draw_pois = true,
            "--drawalpha" => options.draw_alpha = true,
            "--noshading" => options.shading = false,
            "--noemptyimage" => options.no_empty_image = true,
            "--extent" => print_extent = true,
            "--min-y" => min_y = Some(parse_number(&flag, &value()?)?),
            "--max-y" => max_y = Some(parse_number(&flag, &value()?)?),
            "--backend" => {
                let v = value()?;
                options.backend = Some(v.parse::<BackendKind>().map_err(|e| invalid(&flag, &v, e))?);
            }
            "--geometry" => {
                let v = value()?;
                options.geometry = v.parse::<Geometry>().map_err(|e| invalid(&flag, &v, e))?;
            }
            "--zoom" => {
                let v = value()?;
                let zoom: u32 = parse_number(&flag, &v)?;
                if zoom < 1 {
                    return Err(invalid(&flag, &v, "zoom level needs to be 1 or higher"));
                }
                options.zoom = zoom;
            }
            "--colors" => colors = Some(PathBuf::from(value()?)),
            "--scales" => {
                let v = value()?;
                options.scales = v.parse::<Scales>().map_err(|e| invalid(&flag, &v, e))?;
            }
            "--exhaustive" => {
                let v = value()?;
                options.exhaustive = v.parse::<ExhaustiveMode>().map_err(|e| invalid(&flag, &v, e))?;
            }
            "--dumpblock" => {
                let v = value()?;
                dump_block = Some(v.parse::<BlockPos>().map_err(|e| invalid(&flag, &v, e))?);
            }
            _ => return Err(ArgsError::UnknownArgument(arg)),
        }
    }

    let defaults = HeightRange::default();
    options.heights = HeightRange::new(min_y.unwrap_or(defaults.min), max_y.unwrap_or(defaults.max));

    let input = input.ok_or(ArgsError::MissingInput)?;
    let action = if let Some(pos) = dump_block {
        Action::DumpBlock(pos)
    } else if print_extent {
        Action::PrintExtent
    } else {
        Action::Render {
            output: output.ok_or(ArgsError::MissingOutput)?,
        }
    };

    Ok(Parsed::Run(Cli {
        input,
        colors,
        action,
        options,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Cli {
        match parse(args.iter().copied()).expect("arguments should parse") {
            Parsed::Run(cli) => cli,
            Parsed::Help => panic!("expected a run"),
        }
    }

    #[test]
    fn test_minimal_render() {
        let cli = run(&["-i", "world", "-o", "map.png"]);
        assert_eq!(cli.input, PathBuf::from("world"));
        assert_eq!(
            cli.action,
            Action::Render {
                output: PathBuf::from("map.png")
            }
        );
        assert!(cli.options.shading);
        assert_eq!(cli.options.zoom, 1);
        assert_eq!(cli.options.exhaustive, ExhaustiveMode::Auto);
        assert_eq!(cli.options.geometry, Geometry::default());
    }

    #[test]
    fn test_all_flags() {
        let cli = run(&[
            "--input",
            "w",
            "--output=out.png",
            "--bgcolor",
            "#000000",
            "--drawscale",
            "--drawplayers",
            "--draworigin",
            "--drawpois",
            "--drawalpha",
            "--noshading",
            "--noemptyimage",
            "--min-y",
            "80",
            "--max-y",
            "-20",
            "--backend",
            "sqlite3",
            "--geometry",
            "-100:-100+200+200",
            "--zoom",
            "4",
            "--colors",
            "c.txt",
            "--scales",
            "br",
            "--exhaustive",
            "y",
        ]);
        let o = &cli.options;
        assert_eq!(o.background, Color::rgb(0, 0, 0));
        assert!(o.draw_scale && o.draw_players && o.draw_origin && o.draw_pois && o.draw_alpha);
        assert!(!o.shading);
        assert!(o.no_empty_image);
        assert_eq!(o.heights, HeightRange::new(-20, 80));
        assert_eq!(o.backend, Some(BackendKind::Sqlite3));
        assert_eq!(o.geometry.x1, -7);
        assert_eq!(o.zoom, 4);
        assert!(o.scales.bottom && o.scales.right && !o.scales.top);
        assert_eq!(o.exhaustive, ExhaustiveMode::Y);
        assert_eq!(cli.colors, Some(PathBuf::from("c.txt")));
    }

    #[test]
    fn test_extent_and_dumpblock_need_no_output() {
        let cli = run(&["-i", "w", "--extent"]);
        assert_eq!(cli.action, Action::PrintExtent);
        let cli = run(&["-i", "w", "--dumpblock", "1,-2,3"]);
        assert_eq!(cli.action, Action::DumpBlock(BlockPos::new(1, -2, 3)));
    }

    #[test]
    fn test_help() {
        assert!(matches!(parse(["-i", "w", "--help"]), Ok(Parsed::Help)));
        let text = usage();
        assert!(text.contains("--exhaustive"));
        assert!(text.contains("sqlite3"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse(["-o", "x.png"]), Err(ArgsError::MissingInput)));
        assert!(matches!(parse(["-i", "w"]), Err(ArgsError::MissingOutput)));
        assert!(matches!(parse(["-i"]), Err(ArgsError::MissingValue(_))));
        assert!(matches!(parse(["--frobnicate"]), Err(ArgsError::UnknownArgument(_))));
        assert!(matches!(
            parse(["-i", "w", "-o", "o", "--zoom", "0"]),
            Err(ArgsError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(["-i", "w", "-o", "o", "--bgcolor", "red"]),
            Err(ArgsError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(["-i", "w", "-o", "o", "--geometry", "0:0+0+0"]),
            Err(ArgsError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(["-i", "w", "-o", "o", "--exhaustive", "sometimes"]),
            Err(ArgsError::InvalidValue { .. })
        ));
    }
}
