use kiss3d::light::Light;
use kiss3d::nalgebra::{Point3, Translation3};
use kiss3d::window::Window;
use vungeon::maze::{generate_maze, MazeConfig};
use vungeon::random::SeededRandom;
use vungeon::room::{RoomCatalog, RoomKey, TREASURE_ROOM};
use vungeon::room_matcher::match_room;
use vungeon::ROOM_SIZE;

fn main() {
    let mut window = Window::new("Maze 3D");

    window.set_light(Light::StickToCamera);

    let maze = generate_maze(&MazeConfig {
        seed: Some(0),
        ..Default::default()
    })
    .unwrap();
    println!("{}", maze);

    let catalog = RoomCatalog::default();
    let mut rng = SeededRandom::new(Some(0));

    for z in 0..maze.height() as i32 {
        for x in 0..maze.width() as i32 {
            let key = RoomKey::new(x, z);
            let cell = maze.cell_at(&key).unwrap();
            let archetype = match_room(&catalog, cell, maze.is_end_cell(&key), &mut rng);
            let Some(room) = catalog.get(&archetype) else {
                continue;
            };
            let color = if archetype == TREASURE_ROOM {
                (1.0, 0.8, 0.0)
            } else {
                (0.7, 0.7, 0.75)
            };
            for collider in room.world_colliders(&key.world_origin(ROOM_SIZE)) {
                let mut c = window.add_cube(collider.size.x, collider.size.y, collider.size.z);
                c.set_color(color.0, color.1, color.2);
                // colliders stand on their position, cubes are centred
                c.set_local_translation(Translation3::new(
                    collider.position.x,
                    collider.position.y + collider.size.y / 2.0,
                    collider.position.z,
                ));
            }
        }
    }

    let path = maze.solve().unwrap_or_default();

    while window.render() {
        for step in path.windows(2) {
            let (a, b) = (RoomKey::from(step[0]), RoomKey::from(step[1]));
            window.draw_line(
                &Point3::new(a.x as f32 * ROOM_SIZE, 0.5, a.z as f32 * ROOM_SIZE),
                &Point3::new(b.x as f32 * ROOM_SIZE, 0.5, b.z as f32 * ROOM_SIZE),
                &Point3::new(0.0, 1.0, 0.0),
            );
        }
    }
}
