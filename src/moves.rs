use crate::types::{Move, MoveFlag, Piece, PieceKind, Square};

impl MoveFlag {
    /// Bit 2 marks every capturing flag, including the promotion captures.
    #[inline]
    pub fn is_capture(self) -> bool {
        (self as u16) & 0x4 != 0
    }

    #[inline]
    pub fn is_promotion(self) -> bool {
        (self as u16) & 0x8 != 0
    }

    pub fn promotion_kind(self) -> Option<PieceKind> {
        match self {
            MoveFlag::PromoteKnight | MoveFlag::PromoteKnightCapture => Some(PieceKind::Knight),
            MoveFlag::PromoteBishop | MoveFlag::PromoteBishopCapture => Some(PieceKind::Bishop),
            MoveFlag::PromoteRook | MoveFlag::PromoteRookCapture => Some(PieceKind::Rook),
            MoveFlag::PromoteQueen | MoveFlag::PromoteQueenCapture => Some(PieceKind::Queen),
            _ => None,
        }
    }

    /// The promotion flag for a target kind
    pub fn promotion(kind: PieceKind, is_capture: bool) -> MoveFlag {
        match (kind, is_capture) {
            (PieceKind::Knight, false) => MoveFlag::PromoteKnight,
            (PieceKind::Bishop, false) => MoveFlag::PromoteBishop,
            (PieceKind::Rook, false) => MoveFlag::PromoteRook,
            (PieceKind::Knight, true) => MoveFlag::PromoteKnightCapture,
            (PieceKind::Bishop, true) => MoveFlag::PromoteBishopCapture,
            (PieceKind::Rook, true) => MoveFlag::PromoteRookCapture,
            (_, false) => MoveFlag::PromoteQueen,
            (_, true) => MoveFlag::PromoteQueenCapture,
        }
    }
}

impl Move {
    pub fn new(from: Square, to: Square, piece: Piece, flag: MoveFlag) -> Self {
        Self {
            from,
            to,
            piece,
            flag,
        }
    }

    #[inline]
    pub fn is_capture(self) -> bool {
        self.flag.is_capture()
    }

    /// UCI format, e.g. "e2e4" or "e7e8q"
    pub fn to_uci_string(self) -> String {
        let mut result = format!("{}{}", self.from.to_algebraic(), self.to.to_algebraic());

        if let Some(kind) = self.flag.promotion_kind() {
            result.push(match kind {
                PieceKind::Knight => 'n',
                PieceKind::Bishop => 'b',
                PieceKind::Rook => 'r',
                _ => 'q',
            });
        }

        result
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uci_string())
    }
}
