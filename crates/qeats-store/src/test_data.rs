use std::io::Write;

use chrono::NaiveTime;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    Result,
    model::{ItemRecord, Location, MenuRecord, RestaurantRecord},
};

/// Mean Earth radius used for fixture placement, kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Requester position the fixtures are laid out around (central Bengaluru).
pub const CENTER: (f64, f64) = (12.9, 77.6);

pub const SPICE_GARDEN: &str = "r-spice-garden";
pub const DRAGON_BOWL: &str = "r-dragon-bowl";
pub const PIZZA_PIAZZA: &str = "r-pizza-piazza";
pub const DOSA_CORNER: &str = "r-dosa-corner";
pub const LATE_NIGHT_TANDOOR: &str = "r-late-night-tandoor";
pub const FARAWAY_DINER: &str = "r-faraway-diner";

/// Configuration for test data generation
#[derive(Debug, Clone)]
pub struct TestDataConfig {
    /// Number of generated restaurants added on top of the hand-written ones
    pub generated_restaurants: usize,
    /// Number of items on each generated menu
    pub items_per_menu: usize,
    /// Centre the generated restaurants are scattered around
    pub center: (f64, f64),
    /// Generated restaurants are placed within this distance of the centre
    pub max_distance_km: f64,
}

impl Default for TestDataConfig {
    fn default() -> Self {
        Self {
            generated_restaurants: 100,
            items_per_menu: 4,
            center: CENTER,
            max_distance_km: 8.0,
        }
    }
}

impl TestDataConfig {
    /// Only the hand-written restaurants
    pub fn minimal() -> Self {
        Self {
            generated_restaurants: 0,
            items_per_menu: 0,
            ..Self::default()
        }
    }

    /// Hand-written restaurants plus a generated neighbourhood
    pub fn sample() -> Self {
        Self {
            generated_restaurants: 250,
            items_per_menu: 5,
            ..Self::default()
        }
    }
}

/// Move `origin` by the given distances along the north and east axes.
///
/// A purely northward offset of `d` kilometres lands exactly `d` kilometres
/// away by great-circle distance, which makes it handy for radius tests.
pub fn offset_location(origin: Location, north_km: f64, east_km: f64) -> Location {
    let dlat = (north_km / EARTH_RADIUS_KM).to_degrees();
    let dlon = (east_km / (EARTH_RADIUS_KM * origin.latitude().to_radians().cos())).to_degrees();
    let latitude = (origin.latitude() + dlat).clamp(-90.0, 90.0);
    let longitude = wrap_longitude(origin.longitude() + dlon);
    Location::new(latitude, longitude).unwrap_or(origin)
}

fn wrap_longitude(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else if longitude < -180.0 {
        longitude + 360.0
    } else {
        longitude
    }
}

fn center_of(config: &TestDataConfig) -> Location {
    Location::new(config.center.0, config.center.1).unwrap_or(Location {
        latitude: CENTER.0,
        longitude: CENTER.1,
    })
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// The hand-written restaurants, followed by `config.generated_restaurants`
/// generated ones.
pub fn sample_restaurants(config: &TestDataConfig) -> Vec<RestaurantRecord> {
    let center = center_of(config);
    let mut restaurants = vec![
        RestaurantRecord::new(
            SPICE_GARDEN,
            "Spice Garden",
            offset_location(center, 0.5, 0.0),
            hm(7, 0),
            hm(23, 0),
        )
        .with_attributes(["Indian", "North Indian"]),
        RestaurantRecord::new(
            DRAGON_BOWL,
            "Dragon Bowl",
            offset_location(center, 0.0, 1.5),
            hm(11, 0),
            hm(23, 0),
        )
        .with_attributes(["Chinese"]),
        RestaurantRecord::new(
            PIZZA_PIAZZA,
            "Pizza Piazza",
            offset_location(center, 2.5, 0.0),
            hm(10, 0),
            hm(22, 0),
        )
        .with_attributes(["Italian"]),
        RestaurantRecord::new(
            DOSA_CORNER,
            "Masala Dosa Corner",
            offset_location(center, -4.0, 0.0),
            hm(6, 0),
            hm(12, 0),
        )
        .with_attributes(["South Indian", "Breakfast"]),
        RestaurantRecord::new(
            LATE_NIGHT_TANDOOR,
            "Late Night Tandoor",
            offset_location(center, 0.0, -1.0),
            hm(18, 0),
            hm(23, 59),
        )
        .with_attributes(["Indian", "Tandoor"]),
        RestaurantRecord::new(
            FARAWAY_DINER,
            "Faraway Diner",
            offset_location(center, 30.0, 0.0),
            hm(0, 1),
            hm(23, 59),
        )
        .with_attributes(["Diner"]),
    ];
    for restaurant in &mut restaurants {
        restaurant.city = "Bengaluru".to_string();
    }

    restaurants.extend((0..config.generated_restaurants).map(|i| generated_restaurant(config, i)));
    restaurants
}

const CUISINES: [&str; 6] = ["Indian", "Chinese", "Italian", "Thai", "Mexican", "Cafe"];
const DISHES: [(&str, &[&str]); 8] = [
    ("Veg Biryani", &["Vegetarian", "Spicy"]),
    ("Hakka Noodles", &["Vegetarian"]),
    ("Chicken Burrito", &["Spicy"]),
    ("Green Curry", &["Spicy", "Vegan"]),
    ("Tiramisu", &["Sweet"]),
    ("Cold Coffee", &["Cold", "Sweet"]),
    ("Garlic Bread", &["Vegetarian"]),
    ("Fish Tacos", &["Seafood"]),
];

fn generated_restaurant(config: &TestDataConfig, i: usize) -> RestaurantRecord {
    let center = center_of(config);
    // Deterministic spiral so every run sees the same layout.
    let angle = (i as f64) * 2.399_963;
    let fraction = ((i % 97) as f64 + 1.0) / 98.0;
    let distance = config.max_distance_km * fraction;
    let location = offset_location(center, distance * angle.cos(), distance * angle.sin());
    let opens = hm(6 + (i % 6) as u32, 0);
    let closes = hm(20 + (i % 4) as u32, 30);

    RestaurantRecord::new(
        format!("r-gen-{i:04}"),
        format!("{} Kitchen {i}", CUISINES[i % CUISINES.len()]),
        location,
        opens,
        closes,
    )
    .with_city("Bengaluru")
    .with_attributes([CUISINES[i % CUISINES.len()]])
}

/// Menus for the hand-written restaurants, then one menu per generated
/// restaurant with `config.items_per_menu` items.
pub fn sample_menus(config: &TestDataConfig) -> Vec<MenuRecord> {
    let mut menus = vec![
        MenuRecord::new(
            SPICE_GARDEN,
            vec![
                ItemRecord::new("i-paneer-tikka", "Paneer Tikka", ["Spicy", "Vegetarian"]),
                ItemRecord::new("i-butter-naan", "Butter Naan", ["Vegetarian"]),
            ],
        ),
        MenuRecord::new(
            DRAGON_BOWL,
            vec![
                ItemRecord::new("i-kung-pao", "Kung Pao Chicken", ["Spicy"]),
                ItemRecord::new("i-spring-rolls", "Spring Rolls", ["Vegetarian", "Fried"]),
            ],
        ),
        MenuRecord::new(
            PIZZA_PIAZZA,
            vec![
                ItemRecord::new("i-margherita", "Margherita Pizza", ["Vegetarian", "Cheesy"]),
                ItemRecord::new("i-arrabbiata", "Spicy Arrabbiata", ["Pasta"]),
            ],
        ),
        MenuRecord::new(
            DOSA_CORNER,
            vec![
                ItemRecord::new("i-masala-dosa", "Masala Dosa", ["Vegetarian"]),
                ItemRecord::new("i-filter-coffee", "Filter Coffee", ["Hot"]),
            ],
        ),
        MenuRecord::new(
            LATE_NIGHT_TANDOOR,
            vec![
                ItemRecord::new("i-tandoori-chicken", "Tandoori Chicken", ["Spicy", "Grilled"]),
                ItemRecord::new("i-butter-naan", "Butter Naan", ["Vegetarian"]),
            ],
        ),
        MenuRecord::new(
            FARAWAY_DINER,
            vec![ItemRecord::new("i-burger", "Burger", ["Grilled"])],
        ),
    ];

    menus.extend((0..config.generated_restaurants).map(|i| {
        let items = (0..config.items_per_menu)
            .map(|j| {
                let (name, attributes) = DISHES[(i + j) % DISHES.len()];
                let mut item = ItemRecord::new(
                    format!("i-gen-{i:04}-{j}"),
                    name,
                    attributes.iter().copied(),
                );
                item.price = 80.0 + ((i * 7 + j * 13) % 300) as f64;
                item
            })
            .collect();
        MenuRecord::new(format!("r-gen-{i:04}"), items)
    }));
    menus
}

/// Write fixture data to temporary JSON files.
///
/// Returns `(restaurants, menus)` files in the format read by
/// [`InMemoryStore::load_from_files`](crate::InMemoryStore::load_from_files).
pub fn create_test_data(config: &TestDataConfig) -> Result<(NamedTempFile, NamedTempFile)> {
    info!("Creating test data with config: {:?}", config);

    let mut restaurants = NamedTempFile::new()?;
    serde_json::to_writer_pretty(&mut restaurants, &sample_restaurants(config))?;
    restaurants.flush()?;

    let mut menus = NamedTempFile::new()?;
    serde_json::to_writer_pretty(&mut menus, &sample_menus(config))?;
    menus.flush()?;

    Ok((restaurants, menus))
}
