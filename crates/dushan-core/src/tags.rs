//! Attributed scoring tags.
//!
//! Every scoring-relevant event of a hand is recorded as a `Tag` on the
//! player it concerns. The aggregator reads nothing else, so each event must
//! be tagged exactly once.

use crate::player::{Seat, Source};
use serde::{Deserialize, Serialize};

/// How a self-drawn win happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelfWin {
    /// Ordinary self-draw (自摸)
    SelfDraw,
    /// Win on the seat's first draw (天胡)
    HeavenlyHand,
    /// Win on a kong replacement draw (杠上开花)
    KongFlower,
    /// Self-draw of the last wall tile (妙手回春)
    LastTile,
}

/// How a win off another seat happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FedWin {
    /// Caught an ordinary discard (捉炮)
    Discard,
    /// Caught the discard right after a kong replacement draw (捉热炮)
    HotDiscard,
    /// Robbed an added kong (抢杠胡)
    RobKong,
    /// Caught a discard with the wall empty (海底捞月)
    LastDiscard,
}

/// Completed hand shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WinShape {
    /// One pair plus four triplets (大对子)
    BigPairs,
    /// Four exposed melds, won on the single concealed tile (单吊)
    LonePair,
    /// Seven pairs (小七对)
    SmallSevens,
    /// Seven pairs where the winning tile makes a concealed quad (龙七对)
    DragonSevens,
    /// One pair plus four melds (平胡)
    Normal,
    /// Every tile in one suit (清一色)
    Flush,
}

/// Role of a discarded bonus tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonusKind {
    /// Discarded as the seat's first discard (冲锋鸡)
    Charge,
    /// Discarded during the cross round (横鸡)
    Cross,
    /// Any other copy (幺鸡)
    Plain,
}

/// Closed set of tag kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    SelfWin(SelfWin),
    FedWin(FedWin),
    Shape(WinShape),
    /// Public ready commitment (报叫)
    DeclaredReady,
    Bonus(BonusKind),
    /// A discarded bonus tile was claimed by another seat (责任鸡). Kept
    /// once, attributed to the first claimer; scoring reads the Bonus tags.
    ResponsibleBonus,
    /// Fed a winning discard (放炮)
    FedDiscard,
    /// Fed a winning hot discard (放热炮)
    FedHotDiscard,
    /// Bonus tiles burned (鸡全烧)
    AllBurn,
    /// One discard won by two seats (一炮双响)
    DoubleWin,
    /// One discard won by three seats (一炮三响)
    TripleWin,
    /// Exposed bonus tiles without reaching a wait (包鸡)
    BonusPenalty,
}

impl TagKind {
    /// Only plain bonus tags may appear more than once
    pub fn repeatable(&self) -> bool {
        matches!(self, TagKind::Bonus(BonusKind::Plain))
    }

    pub fn label(&self) -> &'static str {
        match self {
            TagKind::SelfWin(SelfWin::SelfDraw) => "自摸",
            TagKind::SelfWin(SelfWin::HeavenlyHand) => "天胡",
            TagKind::SelfWin(SelfWin::KongFlower) => "杠上开花",
            TagKind::SelfWin(SelfWin::LastTile) => "妙手回春",
            TagKind::FedWin(FedWin::Discard) => "捉炮",
            TagKind::FedWin(FedWin::HotDiscard) => "捉热炮",
            TagKind::FedWin(FedWin::RobKong) => "抢杠胡",
            TagKind::FedWin(FedWin::LastDiscard) => "海底捞月",
            TagKind::Shape(WinShape::BigPairs) => "大对子",
            TagKind::Shape(WinShape::LonePair) => "单吊",
            TagKind::Shape(WinShape::SmallSevens) => "小七对",
            TagKind::Shape(WinShape::DragonSevens) => "龙七对",
            TagKind::Shape(WinShape::Normal) => "平胡",
            TagKind::Shape(WinShape::Flush) => "清一色",
            TagKind::DeclaredReady => "报叫",
            TagKind::Bonus(BonusKind::Charge) => "冲锋鸡",
            TagKind::Bonus(BonusKind::Cross) => "横鸡",
            TagKind::Bonus(BonusKind::Plain) => "幺鸡",
            TagKind::ResponsibleBonus => "责任鸡",
            TagKind::FedDiscard => "放炮",
            TagKind::FedHotDiscard => "放热炮",
            TagKind::AllBurn => "鸡全烧",
            TagKind::DoubleWin => "一炮双响",
            TagKind::TripleWin => "一炮三响",
            TagKind::BonusPenalty => "包鸡",
        }
    }
}

/// A tag plus the seat it is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub kind: TagKind,
    pub source: Source,
}

impl Tag {
    pub fn new(kind: TagKind, source: Source) -> Self {
        Self { kind, source }
    }

    pub fn own(kind: TagKind) -> Self {
        Self::new(kind, Source::Own)
    }
}

/// The tags a player collected during one hand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagList(Vec<Tag>);

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag. Returns false if a non-repeatable tag of this kind is already held.
    pub fn add(&mut self, tag: Tag) -> bool {
        if !tag.kind.repeatable() && self.contains(tag.kind) {
            return false;
        }
        self.0.push(tag);
        true
    }

    pub fn contains(&self, kind: TagKind) -> bool {
        self.0.iter().any(|t| t.kind == kind)
    }

    pub fn get(&self, kind: TagKind) -> Option<&Tag> {
        self.0.iter().find(|t| t.kind == kind)
    }

    /// Re-attribute the first self-sourced tag of `kind` to `source`
    pub fn reassign(&mut self, kind: TagKind, source: Source) -> bool {
        match self
            .0
            .iter_mut()
            .find(|t| t.kind == kind && t.source == Source::Own)
        {
            Some(tag) => {
                tag.source = source;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn self_wins(&self) -> impl Iterator<Item = (SelfWin, Source)> + '_ {
        self.0.iter().filter_map(|t| match t.kind {
            TagKind::SelfWin(w) => Some((w, t.source)),
            _ => None,
        })
    }

    pub fn fed_wins(&self) -> impl Iterator<Item = (FedWin, Source)> + '_ {
        self.0.iter().filter_map(|t| match t.kind {
            TagKind::FedWin(w) => Some((w, t.source)),
            _ => None,
        })
    }

    pub fn shapes(&self) -> impl Iterator<Item = (WinShape, Source)> + '_ {
        self.0.iter().filter_map(|t| match t.kind {
            TagKind::Shape(s) => Some((s, t.source)),
            _ => None,
        })
    }

    /// Bonus-tile discard tags still attributed to this player
    pub fn own_bonus(&self) -> impl Iterator<Item = BonusKind> + '_ {
        self.0.iter().filter_map(|t| match (t.kind, t.source) {
            (TagKind::Bonus(b), Source::Own) => Some(b),
            _ => None,
        })
    }

    /// Whether this player collected a win of either family
    pub fn has_won(&self) -> bool {
        self.self_wins().next().is_some() || self.fed_wins().next().is_some()
    }

    /// The seat a tag of `kind` is attributed to, if it is another seat
    pub fn source_seat(&self, kind: TagKind) -> Option<Seat> {
        match self.get(kind)?.source {
            Source::Seat(seat) => Some(seat),
            Source::Own => None,
        }
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_unique_per_kind() {
        let mut tags = TagList::new();
        assert!(tags.add(Tag::own(TagKind::SelfWin(SelfWin::SelfDraw))));
        assert!(!tags.add(Tag::own(TagKind::SelfWin(SelfWin::SelfDraw))));
        assert!(!tags.add(Tag::new(TagKind::SelfWin(SelfWin::SelfDraw), Source::Seat(2))));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_plain_bonus_repeats() {
        let mut tags = TagList::new();
        assert!(tags.add(Tag::own(TagKind::Bonus(BonusKind::Plain))));
        assert!(tags.add(Tag::own(TagKind::Bonus(BonusKind::Plain))));
        assert!(tags.add(Tag::own(TagKind::Bonus(BonusKind::Charge))));
        assert!(!tags.add(Tag::own(TagKind::Bonus(BonusKind::Charge))));
        assert_eq!(tags.own_bonus().count(), 3);
    }

    #[test]
    fn test_responsible_bonus_keeps_first_claimer() {
        let mut tags = TagList::new();
        assert!(tags.add(Tag::new(TagKind::ResponsibleBonus, Source::Seat(1))));
        assert!(!tags.add(Tag::new(TagKind::ResponsibleBonus, Source::Seat(3))));
        assert_eq!(tags.source_seat(TagKind::ResponsibleBonus), Some(1));
    }

    #[test]
    fn test_reassign_moves_only_own_tag() {
        let mut tags = TagList::new();
        tags.add(Tag::own(TagKind::Bonus(BonusKind::Plain)));
        tags.add(Tag::own(TagKind::Bonus(BonusKind::Plain)));

        assert!(tags.reassign(TagKind::Bonus(BonusKind::Plain), Source::Seat(3)));
        assert_eq!(tags.own_bonus().count(), 1);
        assert!(tags.reassign(TagKind::Bonus(BonusKind::Plain), Source::Seat(1)));
        assert!(!tags.reassign(TagKind::Bonus(BonusKind::Plain), Source::Seat(1)));
        assert_eq!(tags.own_bonus().count(), 0);
    }

    #[test]
    fn test_win_families() {
        let mut tags = TagList::new();
        assert!(!tags.has_won());
        tags.add(Tag::new(TagKind::FedWin(FedWin::Discard), Source::Seat(1)));
        assert!(tags.has_won());
        assert_eq!(tags.source_seat(TagKind::FedWin(FedWin::Discard)), Some(1));
        assert_eq!(tags.self_wins().count(), 0);
    }
}
