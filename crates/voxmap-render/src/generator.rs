//! The rendering pipeline: open a world, plan the traversal, composite
//! every block column, shade and decorate the image.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use voxmap_core::constants::BLOCK_SIZE;
use voxmap_core::{BlockPos, Color, Geometry, HeightRange};
use voxmap_persist::BlockDecoder;
use voxmap_world::players::load_players;
use voxmap_world::poi::load_pois;
use voxmap_world::traversal::plan;
use voxmap_world::{open_backend, Backend, BackendKind, Block, BlockStore, ExhaustiveMode, Strategy, WorldSettings};

use crate::attributes::PixelAttributes;
use crate::canvas::Canvas;
use crate::colors::ColorMap;
use crate::compositor::{Compositor, RenderStats};
use crate::error::RenderError;
use crate::layout::{BlockExtent, MapLayout, Scales};
use crate::overlay;
use crate::shading::shade_row;

/// Everything that controls a render besides the world and the color table.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub background: Color,
    pub scale_color: Color,
    pub origin_color: Color,
    pub player_color: Color,
    pub poi_color: Color,
    pub draw_scale: bool,
    pub draw_origin: bool,
    pub draw_players: bool,
    pub draw_pois: bool,
    pub draw_alpha: bool,
    pub shading: bool,
    /// Skip writing an image when the requested area holds no blocks.
    pub no_empty_image: bool,
    pub geometry: Geometry,
    pub heights: HeightRange,
    pub zoom: u32,
    /// Sides that get a scale when `draw_scale` is set.
    pub scales: Scales,
    pub exhaustive: ExhaustiveMode,
    /// Overrides the `backend` key of `world.mt`.
    pub backend: Option<BackendKind>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: Color::rgb(255, 255, 255),
            scale_color: Color::rgb(0, 0, 0),
            origin_color: Color::rgb(255, 0, 0),
            player_color: Color::rgb(255, 0, 0),
            poi_color: Color::rgb(0, 128, 255),
            draw_scale: false,
            draw_origin: false,
            draw_players: false,
            draw_pois: false,
            draw_alpha: false,
            shading: true,
            no_empty_image: false,
            geometry: Geometry::default(),
            heights: HeightRange::default(),
            zoom: 1,
            scales: Scales::TOP_LEFT,
            exhaustive: ExhaustiveMode::Auto,
            backend: None,
        }
    }
}

/// A finished image with the facts gathered while drawing it.
pub struct RenderedMap {
    pub canvas: Canvas,
    pub layout: MapLayout,
    pub strategy: Strategy,
    pub stats: RenderStats,
}

/// Logs rendering progress every ten percent.
struct Progress {
    max: usize,
    last_decile: usize,
}

impl Progress {
    fn new(max: usize) -> Self {
        Self { max, last_decile: 0 }
    }

    fn report(&mut self, done: usize) {
        if self.max == 0 {
            return;
        }
        let percent = done.min(self.max) * 100 / self.max;
        if percent / 10 > self.last_decile {
            self.last_decile = percent / 10;
            log::info!("Rendering: {percent}%");
        }
    }
}

/// Column positions grouped by Z.
type Columns = BTreeMap<i16, BTreeSet<i16>>;

pub struct TileGenerator {
    options: RenderOptions,
    colors: ColorMap,
}

impl TileGenerator {
    pub fn new(options: RenderOptions, colors: ColorMap) -> Self {
        Self { options, colors }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `world` and write the image to `output` as PNG.
    ///
    /// Returns `false` when `no_empty_image` is set and the area is empty,
    /// in which case nothing is written.
    pub fn generate(&self, world: &Path, output: &Path) -> Result<bool, RenderError> {
        let Some(map) = self.render(world)? else {
            log::info!("No blocks in the requested area, not writing {}", output.display());
            return Ok(false);
        };
        map.canvas.save_png(output)?;
        log::info!(
            "Wrote {}x{} image to {}",
            map.canvas.width(),
            map.canvas.height(),
            output.display()
        );
        report_unknown(&map.stats);
        Ok(true)
    }

    /// Render `world` into memory.
    pub fn render(&self, world: &Path) -> Result<Option<RenderedMap>, RenderError> {
        let opts = &self.options;
        let mode = if opts.no_empty_image {
            ExhaustiveMode::Never
        } else {
            opts.exhaustive
        };

        let mut backend = open_backend(world, opts.backend)?;
        let strategy = plan(mode, backend.prefers_range_queries(), &opts.geometry, &opts.heights);
        log::debug!("Traversal strategy: {strategy}");

        let (columns, content) = match strategy {
            Strategy::FullExhaustive => (Columns::new(), Some(BlockExtent::from_geometry(&opts.geometry))),
            Strategy::Never | Strategy::YExhaustive => {
                let positions = self.load_positions(&mut backend)?;
                let content = BlockExtent::of(&positions);
                let mut columns = Columns::new();
                for pos in &positions {
                    columns.entry(pos.z).or_default().insert(pos.x);
                }
                log::debug!(
                    "Loaded {} positions across {} rows",
                    positions.len(),
                    columns.len()
                );
                (columns, content)
            }
        };

        if opts.no_empty_image && content.is_none() {
            return Ok(None);
        }

        let scales = if opts.draw_scale { opts.scales } else { Scales::NONE };
        let layout = MapLayout::new(&opts.geometry, content, opts.zoom, scales);
        let mut canvas = Canvas::new(
            layout.image_width.max(1) as u32,
            layout.image_height.max(1) as u32,
            opts.background,
        );

        let stats = self.render_map(&mut backend, strategy, &columns, &layout, &mut canvas)?;
        drop(backend);

        if opts.draw_scale {
            overlay::draw_scale(&mut canvas, &layout, scales, opts.scale_color);
        }
        if opts.draw_origin {
            overlay::draw_origin(&mut canvas, &layout, opts.origin_color);
        }
        if opts.draw_players || opts.draw_pois {
            let settings = WorldSettings::load(world)?;
            if opts.draw_players {
                let players = load_players(world, &settings)?;
                overlay::draw_players(&mut canvas, &layout, &opts.heights, &players, opts.player_color);
            }
            if opts.draw_pois {
                let pois = load_pois(world, &settings)?;
                overlay::draw_pois(&mut canvas, &layout, &opts.heights, &pois, opts.poi_color);
            }
        }

        Ok(Some(RenderedMap {
            canvas,
            layout,
            strategy,
            stats,
        }))
    }

    /// The block extent of everything stored inside the requested area.
    pub fn print_extent(&self, world: &Path) -> Result<BlockExtent, RenderError> {
        let mut backend = open_backend(world, self.options.backend)?;
        let positions = self.load_positions(&mut backend)?;
        BlockExtent::of(&positions).ok_or(RenderError::EmptyWorld)
    }

    /// Raw data of the block at `pos` as lowercase hex, `None` if absent.
    pub fn dump_block(&self, world: &Path, pos: BlockPos) -> Result<Option<String>, RenderError> {
        let mut backend = open_backend(world, self.options.backend)?;
        let blocks = backend.blocks_at(&[pos])?;
        Ok(blocks
            .into_iter()
            .next()
            .map(|(_, data)| data.iter().map(|b| format!("{b:02x}")).collect()))
    }

    fn load_positions(&self, backend: &mut Backend) -> Result<Vec<BlockPos>, RenderError> {
        let g = &self.options.geometry;
        let h = &self.options.heights;
        let min = BlockPos::new(g.x1, h.block_min(), g.z1);
        let max = BlockPos::new(g.x2, h.block_max(), g.z2);
        Ok(backend.positions_in_range(min, max)?)
    }

    fn render_map(
        &self,
        backend: &mut Backend,
        strategy: Strategy,
        columns: &Columns,
        layout: &MapLayout,
        canvas: &mut Canvas,
    ) -> Result<RenderStats, RenderError> {
        let opts = &self.options;
        let (y_min, y_max) = (opts.heights.block_min(), opts.heights.block_max());
        let mut compositor = Compositor::new(&self.colors, opts.draw_alpha, opts.background, opts.heights);
        let mut attrs = PixelAttributes::new(layout.map_width.max(0) as usize);
        let mut decoder = BlockDecoder::new();
        let mut stats = RenderStats::default();

        let column_count = match strategy {
            Strategy::FullExhaustive => opts.geometry.width() * opts.geometry.depth(),
            _ => columns.values().map(BTreeSet::len).sum(),
        };
        let mut progress = Progress::new(column_count);
        let mut done = 0;

        // Every image row is visited, also rows without blocks, so that the
        // shading buffer always advances one row at a time.
        for z in (layout.z_min..=layout.z_max).rev() {
            let z = z as i16;
            let xs: Vec<i16> = match strategy {
                Strategy::FullExhaustive => (opts.geometry.x1..opts.geometry.x2).rev().collect(),
                _ => columns
                    .get(&z)
                    .map(|xs| xs.iter().rev().copied().collect())
                    .unwrap_or_default(),
            };

            for x in xs {
                let mut blocks = match strategy {
                    Strategy::Never => backend.blocks_in_column(x, z, y_min, y_max)?,
                    Strategy::YExhaustive | Strategy::FullExhaustive => {
                        let positions: Vec<BlockPos> =
                            (y_min..y_max).map(|y| BlockPos::new(x, y, z)).collect();
                        backend.blocks_at(&positions)?
                    }
                };
                blocks.sort_by(|a, b| a.0.cmp(&b.0));
                self.render_column(
                    &blocks,
                    &mut compositor,
                    &mut decoder,
                    layout,
                    canvas,
                    &mut attrs,
                    &mut stats,
                )?;
                done += 1;
                progress.report(done);
            }

            if opts.shading {
                let z_begin = (layout.z_max - z as i32) * BLOCK_SIZE;
                shade_row(z_begin, layout, canvas, &mut attrs, opts.draw_alpha);
            } else {
                attrs.scroll();
            }
        }
        progress.report(column_count);
        Ok(stats)
    }

    /// Composite one column stack, highest block first.
    #[allow(clippy::too_many_arguments)]
    fn render_column(
        &self,
        blocks: &[Block],
        compositor: &mut Compositor<'_>,
        decoder: &mut BlockDecoder,
        layout: &MapLayout,
        canvas: &mut Canvas,
        attrs: &mut PixelAttributes,
        stats: &mut RenderStats,
    ) -> Result<(), RenderError> {
        compositor.begin_column();
        for (pos, data) in blocks {
            decoder
                .decode(data)
                .map_err(|source| RenderError::Decode { pos: *pos, source })?;
            if decoder.is_empty() {
                continue;
            }
            compositor.render_block(decoder, *pos, layout, canvas, attrs, stats);
            if compositor.column_complete() {
                break;
            }
        }
        if let Some((first, _)) = blocks.first() {
            if !compositor.column_complete() {
                compositor.render_bottom(*first, layout, canvas, attrs);
            }
        }
        stats.rendered_any |= compositor.any_height_known();
        Ok(())
    }
}

/// Log node names that had no color.
pub fn report_unknown(stats: &RenderStats) {
    if stats.unknown_nodes.is_empty() {
        return;
    }
    let names: Vec<&str> = stats.unknown_nodes.iter().map(String::as_str).collect();
    log::warn!("Unknown nodes:\n\t{}", names.join("\n\t"));
    if !stats.rendered_any {
        log::warn!(
            "The map was read successfully and not empty, but none of the encountered nodes \
             had a color associated. Check that you're using the right colors.txt. It should \
             match the game you have installed."
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use voxmap_core::pos::encode_block_pos;
    use voxmap_persist::BlockBuilder;

    const GRAY: Color = Color::rgb(128, 128, 128);

    fn create_world(blocks: &[(BlockPos, Vec<u8>)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("should create temp dir");
        std::fs::write(dir.path().join("world.mt"), "backend = sqlite3\n").expect("should write world.mt");
        let conn = Connection::open(dir.path().join("map.sqlite")).expect("should create map.sqlite");
        conn.execute_batch("CREATE TABLE blocks (pos INT PRIMARY KEY NOT NULL, data BLOB NOT NULL);")
            .expect("should create table");
        for (pos, data) in blocks {
            conn.execute(
                "INSERT INTO blocks (pos, data) VALUES (?1, ?2)",
                rusqlite::params![encode_block_pos(*pos), data],
            )
            .expect("should insert block");
        }
        dir
    }

    fn stone_block() -> Vec<u8> {
        BlockBuilder::new(29)
            .with_name(0, "air")
            .with_name(1, "ignore")
            .with_name(2, "stone")
            .fill(2)
            .encode()
            .expect("block should encode")
    }

    fn stone_colors() -> ColorMap {
        ColorMap::parse("stone 128 128 128 255 0\n")
    }

    fn single_tile_options() -> RenderOptions {
        RenderOptions {
            geometry: "0:0+16+16".parse().expect("should parse geometry"),
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_stone_block_renders_uniform_tile() {
        let world = create_world(&[(BlockPos::new(0, 0, 0), stone_block())]);
        let generator = TileGenerator::new(single_tile_options(), stone_colors());
        let map = generator
            .render(world.path())
            .expect("render should succeed")
            .expect("area is not empty");

        assert_eq!((map.canvas.width(), map.canvas.height()), (16, 16));
        assert!(map.canvas.image().pixels().all(|p| p.0 == [128, 128, 128, 255]));
        assert!(map.stats.unknown_nodes.is_empty());
        assert!(map.stats.rendered_any);
        assert_eq!(map.strategy, Strategy::Never);
    }

    #[test]
    fn test_stone_block_heights_are_topmost() {
        let colors = stone_colors();
        let block = stone_block();
        let mut decoder = BlockDecoder::new();
        decoder.decode(&block).expect("should decode");
        let geometry: Geometry = "0:0+16+16".parse().expect("should parse geometry");
        let layout = MapLayout::new(&geometry, None, 1, Scales::NONE);
        let mut canvas = Canvas::new(16, 16, Color::rgb(255, 255, 255));
        let mut attrs = PixelAttributes::new(16);
        let mut stats = RenderStats::default();
        let mut compositor = Compositor::new(&colors, false, Color::rgb(255, 255, 255), HeightRange::default());
        compositor.begin_column();
        compositor.render_block(&decoder, BlockPos::new(0, 0, 0), &layout, &mut canvas, &mut attrs, &mut stats);
        for z in 0..16 {
            for x in 0..16 {
                assert_eq!(attrs.get(z, x).height, 15);
            }
        }
    }

    #[test]
    fn test_unknown_nodes_are_collected() {
        let block = BlockBuilder::new(28)
            .with_name(0, "air")
            .with_name(1, "mymod:thing")
            .layer(0, 1)
            .encode()
            .expect("block should encode");
        let world = create_world(&[(BlockPos::new(0, 0, 0), block)]);
        let generator = TileGenerator::new(single_tile_options(), stone_colors());
        let map = generator
            .render(world.path())
            .expect("render should succeed")
            .expect("area is not empty");
        assert!(map.stats.unknown_nodes.contains("mymod:thing"));
        assert!(!map.stats.rendered_any);
        assert!(map.canvas.image().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_upper_block_hides_lower() {
        let grass = BlockBuilder::new(29)
            .with_name(0, "air")
            .with_name(1, "grass")
            .layer(3, 1)
            .encode()
            .expect("block should encode");
        let world = create_world(&[
            (BlockPos::new(0, 0, 0), stone_block()),
            (BlockPos::new(0, 1, 0), grass),
        ]);
        let colors = ColorMap::parse("stone 128 128 128\ngrass 0 200 0\n");
        let options = RenderOptions {
            shading: false,
            ..single_tile_options()
        };
        let map = TileGenerator::new(options, colors)
            .render(world.path())
            .expect("render should succeed")
            .expect("area is not empty");
        assert_eq!(map.canvas.pixel(5, 5), Color::rgb(0, 200, 0));
    }

    #[test]
    fn test_crops_to_content_without_geometry() {
        let world = create_world(&[
            (BlockPos::new(2, 0, 5), stone_block()),
            (BlockPos::new(3, 0, 4), stone_block()),
        ]);
        let map = TileGenerator::new(RenderOptions::default(), stone_colors())
            .render(world.path())
            .expect("render should succeed")
            .expect("area is not empty");
        assert_eq!((map.canvas.width(), map.canvas.height()), (32, 32));
        // block (2, 5) is the top-left tile, (3, 4) the bottom-right one
        assert_eq!(map.canvas.pixel(0, 0), GRAY);
        assert_eq!(map.canvas.pixel(31, 31), GRAY);
        assert_eq!(map.canvas.pixel(31, 0), Color::rgb(255, 255, 255));
    }

    #[test]
    fn test_full_exhaustive_matches_range_traversal() {
        let world = create_world(&[
            (BlockPos::new(0, 0, 0), stone_block()),
            (BlockPos::new(1, 0, 1), stone_block()),
        ]);
        let geometry: Geometry = "0:0+32+32".parse().expect("should parse geometry");
        let render = |exhaustive| {
            let options = RenderOptions {
                geometry,
                heights: HeightRange::new(-16, 31),
                exhaustive,
                ..RenderOptions::default()
            };
            TileGenerator::new(options, stone_colors())
                .render(world.path())
                .expect("render should succeed")
                .expect("area is not empty")
        };
        let ranged = render(ExhaustiveMode::Never);
        let full = render(ExhaustiveMode::Full);
        let y_only = render(ExhaustiveMode::Y);
        assert_eq!(full.strategy, Strategy::FullExhaustive);
        assert_eq!(y_only.strategy, Strategy::YExhaustive);
        assert_eq!(ranged.canvas.image(), full.canvas.image());
        assert_eq!(ranged.canvas.image(), y_only.canvas.image());
    }

    #[test]
    fn test_no_empty_image_skips_output() {
        let world = create_world(&[(BlockPos::new(10, 0, 10), stone_block())]);
        let options = RenderOptions {
            no_empty_image: true,
            ..single_tile_options()
        };
        let generator = TileGenerator::new(options, stone_colors());
        let output = world.path().join("map.png");
        let written = generator.generate(world.path(), &output).expect("generate should succeed");
        assert!(!written);
        assert!(!output.exists());
    }

    #[test]
    fn test_generate_writes_png() {
        let world = create_world(&[(BlockPos::new(0, 0, 0), stone_block())]);
        let options = RenderOptions {
            draw_scale: true,
            draw_origin: true,
            ..single_tile_options()
        };
        let output = world.path().join("map.png");
        let written = TileGenerator::new(options, stone_colors())
            .generate(world.path(), &output)
            .expect("generate should succeed");
        assert!(written);
        let image = image::open(&output).expect("should read written png");
        assert_eq!((image.width(), image.height()), (56, 56));
    }

    #[test]
    fn test_corrupt_block_aborts() {
        let world = create_world(&[(BlockPos::new(0, 0, 0), vec![21, 0, 0])]);
        let generator = TileGenerator::new(single_tile_options(), stone_colors());
        assert!(matches!(
            generator.render(world.path()),
            Err(RenderError::Decode { pos, .. }) if pos == BlockPos::new(0, 0, 0)
        ));
    }

    #[test]
    fn test_print_extent() {
        let world = create_world(&[
            (BlockPos::new(-3, 0, 2), stone_block()),
            (BlockPos::new(4, 7, -1), stone_block()),
        ]);
        let generator = TileGenerator::new(RenderOptions::default(), stone_colors());
        let extent = generator.print_extent(world.path()).expect("should find extent");
        assert_eq!(extent.to_string(), "-48:-16+128+64");
    }

    #[test]
    fn test_print_extent_empty_world() {
        let world = create_world(&[]);
        let generator = TileGenerator::new(RenderOptions::default(), stone_colors());
        assert!(matches!(
            generator.print_extent(world.path()),
            Err(RenderError::EmptyWorld)
        ));
    }

    #[test]
    fn test_dump_block() {
        let world = create_world(&[(BlockPos::new(1, 2, 3), vec![0x1d, 0xab, 0x00])]);
        let generator = TileGenerator::new(RenderOptions::default(), stone_colors());
        assert_eq!(
            generator
                .dump_block(world.path(), BlockPos::new(1, 2, 3))
                .expect("should query"),
            Some("1dab00".to_string())
        );
        assert_eq!(
            generator
                .dump_block(world.path(), BlockPos::new(0, 0, 0))
                .expect("should query"),
            None
        );
    }

    #[test]
    fn test_progress_deciles() {
        let mut progress = Progress::new(20);
        progress.report(1);
        assert_eq!(progress.last_decile, 0);
        progress.report(5);
        assert_eq!(progress.last_decile, 2);
        progress.report(20);
        assert_eq!(progress.last_decile, 10);
    }
}
