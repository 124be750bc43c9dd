use crate::types::{Piece, PieceKind};

impl PieceKind {
    /// Traditional material value in pawn units. The king carries none;
    /// losing it ends the game before material matters.
    pub const fn value(self) -> f64 {
        match self {
            PieceKind::Pawn => 1.0,
            PieceKind::Knight => 3.0,
            PieceKind::Bishop => 3.0,
            PieceKind::Rook => 5.0,
            PieceKind::Queen => 9.0,
            PieceKind::King => 0.0,
        }
    }

    pub fn iter() -> impl Iterator<Item = PieceKind> {
        [
            PieceKind::Pawn,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
            PieceKind::King,
        ]
        .into_iter()
    }
}

impl Piece {
    /// Attach a color to a colorless kind. Black labels sit 7 above white.
    pub fn of_kind(kind: PieceKind, is_white: bool) -> Piece {
        let index = if is_white { kind as u8 } else { kind as u8 + 7 };
        Piece::try_from(index).expect("colored piece index is always in range")
    }

    /// The colorless kind, or None for the aggregate boards.
    pub fn kind(self) -> Option<PieceKind> {
        let index = self as u8;
        match index {
            0..=5 => Some(Self::kind_from_index(index)),
            7..=12 => Some(Self::kind_from_index(index - 7)),
            _ => None,
        }
    }

    fn kind_from_index(index: u8) -> PieceKind {
        // SAFETY: callers pass 0-5, which matches the PieceKind variants
        unsafe { std::mem::transmute::<u8, PieceKind>(index) }
    }

    pub fn is_white(self) -> bool {
        (self as u8) <= 5
    }

    pub fn is_aggregate(self) -> bool {
        matches!(self, Piece::WhiteAll | Piece::BlackAll | Piece::BothAll)
    }

    /// The aggregate board for a color
    pub fn all_for(is_white: bool) -> Piece {
        if is_white {
            Piece::WhiteAll
        } else {
            Piece::BlackAll
        }
    }

    /// The twelve specific pieces, skipping the aggregates
    pub fn specific_iter() -> impl Iterator<Item = Piece> {
        (0u8..13)
            .filter(|&index| index != Piece::WhiteAll as u8)
            .map(|index| Piece::try_from(index).expect("specific piece index is in range"))
    }

    pub fn to_fen_char(self) -> Option<char> {
        let letter = match self.kind()? {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };

        if self.is_white() {
            Some(letter.to_ascii_uppercase())
        } else {
            Some(letter)
        }
    }

    pub fn from_fen_char(letter: char) -> Result<Piece, String> {
        let kind = match letter.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return Err(format!("Invalid FEN piece letter: '{}'", letter)),
        };

        Ok(Piece::of_kind(kind, letter.is_ascii_uppercase()))
    }
}

impl TryFrom<u8> for Piece {
    type Error = &'static str;

    /// Converts from a number representing the piece
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 14 {
            return Err("Piece index out of range (must be 0-14)");
        }

        // SAFETY: We've verified value is in range 0-14, which matches our enum variants
        Ok(unsafe { std::mem::transmute::<u8, Piece>(value) })
    }
}
