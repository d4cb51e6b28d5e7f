use crate::maze::MazeCell;
use crate::random::RandomSource;
use crate::room::{ArchetypeId, DoorSet, RoomCatalog, DEFAULT_ROOM, TREASURE_ROOM};

const MIN_MATCH_RATIO: f32 = 0.5;
const TIE_BAND: f32 = 0.1;

/// Share of the cell's openings that the archetype also has a door for.
/// A cell without openings matches nothing.
pub fn match_ratio(cell: &DoorSet, archetype: &DoorSet) -> f32 {
    let required = cell.count();
    if required == 0 {
        return 0.0;
    }
    cell.shared(archetype) as f32 / required as f32
}

/// Picks the archetype to build for a maze cell. The end cell is always the
/// treasure room.
pub fn match_room(
    catalog: &RoomCatalog,
    cell: &MazeCell,
    is_end_cell: bool,
    rng: &mut dyn RandomSource,
) -> ArchetypeId {
    if is_end_cell {
        return TREASURE_ROOM;
    }

    let openings = cell.openings();
    let scored = catalog
        .iter()
        .filter(|archetype| archetype.id != TREASURE_ROOM && archetype.weight > 0)
        .map(|archetype| (archetype, match_ratio(&openings, &archetype.doors)))
        .filter(|(_, ratio)| *ratio >= MIN_MATCH_RATIO)
        .collect::<Vec<_>>();
    if scored.is_empty() {
        return DEFAULT_ROOM;
    }

    let perfect = scored
        .iter()
        .filter(|(archetype, _)| archetype.doors == openings)
        .map(|(archetype, _)| archetype.id)
        .collect::<Vec<_>>();
    if !perfect.is_empty() {
        return perfect[rng.pick_index(perfect.len())];
    }

    let top = scored
        .iter()
        .map(|(_, ratio)| *ratio)
        .fold(f32::MIN, f32::max);
    let tied = scored
        .iter()
        .filter(|(_, ratio)| *ratio >= top - TIE_BAND)
        .map(|(archetype, _)| archetype.id)
        .collect::<Vec<_>>();
    tied[rng.pick_index(tied.len())]
}
