/// Rolling track: a one-dimensional strip of cells the ball rolls along.
///
/// ## Layouts:
///   - **Static**: hand-built spacing derived from the level index.
///   - **Procedural**: generated from a seed (scene name + replay round),
///     only for scenes the classifier marks procedural.
///
/// The last cell is always the goal; the ball starts on cell 0.

/// Cell types and their properties.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Pickup,
    Goal,
}

impl Tile {
    pub fn is_pickup(self) -> bool {
        matches!(self, Tile::Pickup)
    }

    pub fn is_goal(self) -> bool {
        matches!(self, Tile::Goal)
    }
}

/// Roll direction (continuous while key held).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Roll {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub tiles: Vec<Tile>,
}

const MIN_PICKUPS: usize = 3;
const MAX_PICKUPS: usize = 8;

impl Track {
    /// Fixed layout: pickups every four cells, more of them on later levels.
    pub fn hand_built(level_index: i32) -> Self {
        let pickups = (MIN_PICKUPS as i32 + level_index.clamp(0, 5)) as usize;
        let width = 6 + pickups * 4;
        let mut tiles = vec![Tile::Empty; width];
        for i in 0..pickups {
            tiles[3 + i * 4] = Tile::Pickup;
        }
        tiles[width - 1] = Tile::Goal;
        Track { tiles }
    }

    /// Seeded layout: random width and pickup positions.
    pub fn generated(seed: u64) -> Self {
        let mut rng = Lcg::new(seed);
        let width = 24 + rng.below(17) as usize;
        let pickups = MIN_PICKUPS + 1 + rng.below((MAX_PICKUPS - MIN_PICKUPS) as u32) as usize;

        let mut tiles = vec![Tile::Empty; width];
        tiles[width - 1] = Tile::Goal;

        // Cells 1..width-1 are eligible; start and goal stay clear.
        let mut placed = 0;
        while placed < pickups {
            let x = 1 + rng.below((width - 2) as u32) as usize;
            if tiles[x] == Tile::Empty {
                tiles[x] = Tile::Pickup;
                placed += 1;
            }
        }
        Track { tiles }
    }

    pub fn width(&self) -> usize {
        self.tiles.len()
    }

    pub fn at(&self, x: usize) -> Tile {
        self.tiles.get(x).copied().unwrap_or_default()
    }

    pub fn clear(&mut self, x: usize) {
        if let Some(t) = self.tiles.get_mut(x) {
            *t = Tile::Empty;
        }
    }

    pub fn pickup_count(&self) -> u32 {
        self.tiles.iter().filter(|t| t.is_pickup()).count() as u32
    }
}

/// Seed for a procedural scene: stable across runs, varied per round.
pub fn layout_seed(scene: &str, round: u32) -> u64 {
    // FNV-1a over the folded name.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in scene.to_lowercase().bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash ^ (round as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Small LCG; layouts only need to be deterministic, not good.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Lcg(seed | 1)
    }

    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, n: u32) -> u32 {
        if n == 0 { 0 } else { self.next() % n }
    }
}
