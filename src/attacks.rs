use std::sync::OnceLock;

use rand::{thread_rng, Rng};

use crate::{
    constants::NUM_SQUARES,
    types::{BitBoard, Square},
};

// A brief explanation of magic bitboards: to find where a sliding piece can
// move we need the occupancy of the squares along its rays. Intersecting the
// board occupancy with a per-square relevance mask leaves at most 12
// meaningful bits scattered through a u64. Multiplying by a "magic" number
// gathers those bits into the top of the word, and shifting down by
// 64 - shift turns them into a dense table index. The magic is found by
// trial: candidates are drawn until every occupancy subset maps to its own
// slot (or to a slot holding an identical attack set).
//
// Given a Magic m and the full board occupancy occ, the attack set is
// m.table[((occ & m.mask) * m.magic) >> (64 - m.shift)]
pub struct Magic {
    pub magic: u64,
    pub mask: u64,
    pub shift: u32,
    table: Vec<u64>,
}

impl Magic {
    #[inline]
    pub fn attacks(&self, occupancy: u64) -> BitBoard {
        let index = ((occupancy & self.mask).wrapping_mul(self.magic)) >> (64 - self.shift);
        BitBoard(self.table[index as usize])
    }
}

/// The process-wide attack tables: empty-board masks for the leapers and
/// magic lookups for the sliders.
pub struct AttackTables {
    pub knight_moves: [BitBoard; NUM_SQUARES],
    pub king_moves: [BitBoard; NUM_SQUARES],
    rook_magics: [Magic; NUM_SQUARES],
    bishop_magics: [Magic; NUM_SQUARES],
}

static ATTACK_TABLES: OnceLock<AttackTables> = OnceLock::new();

/// Build the tables if they have not been built yet. Call once at startup;
/// the tables live for the rest of the process.
pub fn initialize_attack_tables() {
    attack_tables();
}

pub fn attack_tables() -> &'static AttackTables {
    ATTACK_TABLES.get_or_init(AttackTables::build)
}

impl AttackTables {
    #[inline]
    pub fn rook_attacks(&self, square: Square, occupancy: u64) -> BitBoard {
        self.rook_magics[square as usize].attacks(occupancy)
    }

    #[inline]
    pub fn bishop_attacks(&self, square: Square, occupancy: u64) -> BitBoard {
        self.bishop_magics[square as usize].attacks(occupancy)
    }

    #[inline]
    pub fn queen_attacks(&self, square: Square, occupancy: u64) -> BitBoard {
        BitBoard(self.rook_attacks(square, occupancy).0 | self.bishop_attacks(square, occupancy).0)
    }

    fn build() -> Self {
        Self {
            knight_moves: Self::get_knight_moves(),
            king_moves: Self::get_king_moves(),
            rook_magics: std::array::from_fn(|square| find_magic(square as u8, true)),
            bishop_magics: std::array::from_fn(|square| find_magic(square as u8, false)),
        }
    }

    fn get_knight_moves() -> [BitBoard; NUM_SQUARES] {
        let mut moves = [BitBoard(0); NUM_SQUARES];

        for square in Square::iter() {
            let rank = square.rank() as i32;
            let file = square.file() as i32;

            for (rank_step, file_step) in [
                (2, 1),
                (1, 2),
                (-1, 2),
                (-2, 1),
                (-2, -1),
                (-1, -2),
                (1, -2),
                (2, -1),
            ] {
                let to_rank = rank + rank_step;
                let to_file = file + file_step;

                if (0..8).contains(&to_rank) && (0..8).contains(&to_file) {
                    moves[square as usize].0 |= 1u64 << (to_rank * 8 + to_file);
                }
            }
        }

        moves
    }

    fn get_king_moves() -> [BitBoard; NUM_SQUARES] {
        let mut moves = [BitBoard(0); NUM_SQUARES];

        for square in Square::iter() {
            let rank = square.rank() as i32;
            let file = square.file() as i32;

            for rank_step in -1..=1 {
                for file_step in -1..=1 {
                    if rank_step == 0 && file_step == 0 {
                        continue;
                    }

                    let to_rank = rank + rank_step;
                    let to_file = file + file_step;

                    if (0..8).contains(&to_rank) && (0..8).contains(&to_file) {
                        moves[square as usize].0 |= 1u64 << (to_rank * 8 + to_file);
                    }
                }
            }
        }

        moves
    }
}

const ROOK_DIRECTIONS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRECTIONS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// The relevance mask for a sliding piece: the squares along each ray,
/// excluding the board edge at the end of the ray. A blocker on the edge
/// cannot change the attack set, so edge squares carry no information.
fn occupancy_mask(square: u8, is_rook: bool) -> u64 {
    let directions = if is_rook {
        ROOK_DIRECTIONS
    } else {
        BISHOP_DIRECTIONS
    };

    let rank = (square / 8) as i32;
    let file = (square % 8) as i32;
    let mut mask = 0u64;

    for (rank_step, file_step) in directions {
        let mut to_rank = rank + rank_step;
        let mut to_file = file + file_step;

        while (0..8).contains(&(to_rank + rank_step)) && (0..8).contains(&(to_file + file_step)) {
            mask |= 1u64 << (to_rank * 8 + to_file);
            to_rank += rank_step;
            to_file += file_step;
        }
    }

    mask
}

/// Ray-cast the true attack set for one occupancy. The first occupied square
/// in each direction is included; whether it may actually be captured is the
/// move generator's concern.
fn sliding_attack(square: u8, occupancy: u64, is_rook: bool) -> u64 {
    let directions = if is_rook {
        ROOK_DIRECTIONS
    } else {
        BISHOP_DIRECTIONS
    };

    let rank = (square / 8) as i32;
    let file = (square % 8) as i32;
    let mut attack = 0u64;

    for (rank_step, file_step) in directions {
        let mut to_rank = rank + rank_step;
        let mut to_file = file + file_step;

        while (0..8).contains(&to_rank) && (0..8).contains(&to_file) {
            let bit = 1u64 << (to_rank * 8 + to_file);
            attack |= bit;

            if occupancy & bit != 0 {
                break;
            }

            to_rank += rank_step;
            to_file += file_step;
        }
    }

    attack
}

/// Enumerate every subset of a mask (Carry-Rippler traversal)
fn mask_subsets(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1 << mask.count_ones());
    let mut subset = 0u64;

    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }

    subsets
}

/// Search for a magic number for one square. Candidates are the AND of three
/// random words, which biases them toward the low popcounts that tend to
/// work. Generation cannot fail; it retries until a collision-free mapping
/// is found, which in practice takes well under a second.
fn find_magic(square: u8, is_rook: bool) -> Magic {
    let mask = occupancy_mask(square, is_rook);
    let shift = mask.count_ones();

    let subsets = mask_subsets(mask);
    let attacks: Vec<u64> = subsets
        .iter()
        .map(|&subset| sliding_attack(square, subset, is_rook))
        .collect();

    let mut rng = thread_rng();
    let table_size = 1usize << shift;
    let mut table = vec![u64::MAX; table_size];

    loop {
        // u64::MAX marks unfilled slots; no real attack set has all 64 bits
        table.fill(u64::MAX);

        let candidate: u64 = rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>();

        let mut collision = false;
        for (subset, attack) in subsets.iter().zip(&attacks) {
            let index = (subset.wrapping_mul(candidate) >> (64 - shift)) as usize;

            if table[index] == u64::MAX || table[index] == *attack {
                table[index] = *attack;
            } else {
                collision = true;
                break;
            }
        }

        if !collision {
            return Magic {
                magic: candidate,
                mask,
                shift,
                table,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knight_and_king_move_counts() {
        let tables = attack_tables();

        // Corner, edge, and center cases
        assert_eq!(tables.knight_moves[Square::A1 as usize].0.count_ones(), 2);
        assert_eq!(tables.knight_moves[Square::B1 as usize].0.count_ones(), 3);
        assert_eq!(tables.knight_moves[Square::E4 as usize].0.count_ones(), 8);
        assert_eq!(tables.king_moves[Square::A1 as usize].0.count_ones(), 3);
        assert_eq!(tables.king_moves[Square::A4 as usize].0.count_ones(), 5);
        assert_eq!(tables.king_moves[Square::E4 as usize].0.count_ones(), 8);
    }

    #[test]
    fn knight_moves_from_e5() {
        let tables = attack_tables();
        let expected: u64 = [
            Square::F7,
            Square::G6,
            Square::G4,
            Square::F3,
            Square::D3,
            Square::C4,
            Square::C6,
            Square::D7,
        ]
        .iter()
        .map(|square| square.as_bit())
        .sum();

        assert_eq!(tables.knight_moves[Square::E5 as usize].0, expected);
    }

    #[test]
    fn occupancy_masks_have_the_standard_popcounts() {
        // Corners and centers of the standard shift tables
        assert_eq!(occupancy_mask(Square::A1 as u8, true).count_ones(), 12);
        assert_eq!(occupancy_mask(Square::B1 as u8, true).count_ones(), 11);
        assert_eq!(occupancy_mask(Square::D4 as u8, true).count_ones(), 10);
        assert_eq!(occupancy_mask(Square::A1 as u8, false).count_ones(), 6);
        assert_eq!(occupancy_mask(Square::B1 as u8, false).count_ones(), 5);
        assert_eq!(occupancy_mask(Square::C3 as u8, false).count_ones(), 7);
        assert_eq!(occupancy_mask(Square::D4 as u8, false).count_ones(), 9);
    }

    #[test]
    fn magic_lookups_match_ray_casting() {
        let tables = attack_tables();
        let mut rng = thread_rng();

        for square in Square::iter() {
            for _ in 0..20 {
                let occupancy: u64 = rng.gen::<u64>() & rng.gen::<u64>();

                assert_eq!(
                    tables.rook_attacks(square, occupancy).0,
                    sliding_attack(square as u8, occupancy, true),
                    "rook attacks differ on {:?}",
                    square
                );
                assert_eq!(
                    tables.bishop_attacks(square, occupancy).0,
                    sliding_attack(square as u8, occupancy, false),
                    "bishop attacks differ on {:?}",
                    square
                );
            }
        }
    }

    #[test]
    fn rook_attacks_stop_at_blockers() {
        let tables = attack_tables();

        // Blockers on d6 and g4; the attack includes them but not beyond
        let occupancy = Square::D6.as_bit() | Square::G4.as_bit() | Square::D4.as_bit();
        let attacks = tables.rook_attacks(Square::D4, occupancy);

        assert!(attacks.is_bit_set(Square::D5));
        assert!(attacks.is_bit_set(Square::D6));
        assert!(!attacks.is_bit_set(Square::D7));
        assert!(attacks.is_bit_set(Square::G4));
        assert!(!attacks.is_bit_set(Square::H4));
        assert!(attacks.is_bit_set(Square::A4));
        assert!(attacks.is_bit_set(Square::D1));
    }
}
