//! Vehicle classes and level definitions
//!
//! These are plain data handed over by the asset loader. They are validated
//! once here, at load time; the tick stages assume validated input.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;

use super::types::{CityCategory, Position};

/// A kind of vehicle with its physical limits and economic value
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleClass {
    pub name: String,
    /// Bumper-to-bumper length, also the width used in spacing checks
    pub length: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Braking rate in units per second squared
    pub brakes: f32,
    pub acceleration: f32,
    /// Charged when a vehicle of this class crashes
    pub cost: i64,
    /// Earned when a vehicle of this class arrives
    pub reward: i64,
}

impl VehicleClass {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            bail!("Vehicle class has an empty name");
        }
        if self.length <= 0.0 {
            bail!("Vehicle class {:?} must have a positive length", self.name);
        }
        if self.brakes <= 0.0 || self.acceleration <= 0.0 {
            bail!(
                "Vehicle class {:?} must have positive brake and acceleration rates",
                self.name
            );
        }
        if self.min_speed < 0.0 || self.min_speed > self.max_speed {
            bail!(
                "Vehicle class {:?} has an invalid speed range {}..{}",
                self.name,
                self.min_speed,
                self.max_speed
            );
        }
        Ok(())
    }
}

/// All vehicle classes known to a session
#[derive(Debug, Clone, Default)]
pub struct VehicleCatalog {
    classes: Vec<VehicleClass>,
}

impl VehicleCatalog {
    pub fn new(classes: Vec<VehicleClass>) -> Result<Self> {
        let catalog = Self { classes };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for class in &self.classes {
            class.validate()?;
            if !seen.insert(class.name.as_str()) {
                bail!("Duplicate vehicle class {:?}", class.name);
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&VehicleClass> {
        self.classes.iter().find(|class| class.name == name)
    }

    /// The class used for organic, demand-driven traffic
    pub fn default_class(&self) -> Option<&VehicleClass> {
        self.classes.first()
    }

    pub fn classes(&self) -> &[VehicleClass] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Car, van and truck with the figures used by the demo level
    pub fn demo() -> Self {
        Self {
            classes: vec![
                VehicleClass {
                    name: "car".to_string(),
                    length: 12.0,
                    min_speed: 60.0,
                    max_speed: 140.0,
                    brakes: 240.0,
                    acceleration: 80.0,
                    cost: 5_000,
                    reward: 100,
                },
                VehicleClass {
                    name: "van".to_string(),
                    length: 16.0,
                    min_speed: 50.0,
                    max_speed: 110.0,
                    brakes: 200.0,
                    acceleration: 60.0,
                    cost: 8_000,
                    reward: 180,
                },
                VehicleClass {
                    name: "truck".to_string(),
                    length: 24.0,
                    min_speed: 40.0,
                    max_speed: 90.0,
                    brakes: 150.0,
                    acceleration: 40.0,
                    cost: 20_000,
                    reward: 400,
                },
            ],
        }
    }
}

/// One batch of vehicles leaving a city when a wave starts
#[derive(Debug, Clone, PartialEq)]
pub struct WaveComponent {
    pub class_name: String,
    pub amount: u32,
    pub to: CityCategory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveFromCity {
    /// Index into `Level::cities`
    pub from: usize,
    pub vehicles: Vec<WaveComponent>,
}

/// A scripted batch of dispatch requests, activated as a whole
pub type Wave = Vec<WaveFromCity>;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelCity {
    pub name: String,
    pub position: Position,
    pub category: CityCategory,
    pub population: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelRoad {
    /// Index into `Level::cities`
    pub from: usize,
    /// Index into `Level::cities`
    pub to: usize,
    pub lanes: usize,
}

/// A playable map: cities, prebuilt roads and the waves to send over them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Level {
    pub cities: Vec<LevelCity>,
    pub roads: Vec<LevelRoad>,
    pub waves: Vec<Wave>,
}

impl Level {
    pub fn validate(&self, catalog: &VehicleCatalog) -> Result<()> {
        let city_count = self.cities.len();

        for (index, road) in self.roads.iter().enumerate() {
            if road.from >= city_count || road.to >= city_count {
                bail!("Road {} references a city that does not exist", index);
            }
            if road.from == road.to {
                bail!("Road {} starts and ends in the same city", index);
            }
            if road.lanes == 0 {
                bail!("Road {} must have at least one lane", index);
            }
        }

        for (wave_index, wave) in self.waves.iter().enumerate() {
            for from_city in wave {
                if from_city.from >= city_count {
                    bail!(
                        "Wave {} dispatches from city {} which does not exist",
                        wave_index,
                        from_city.from
                    );
                }
                for component in &from_city.vehicles {
                    catalog.get(&component.class_name).with_context(|| {
                        format!(
                            "Wave {} uses unknown vehicle class {:?}",
                            wave_index, component.class_name
                        )
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Four cities around a hub with two-way, multi-lane roads and three waves
    pub fn demo() -> Self {
        let city = |name: &str, x: f32, y: f32, category, population| LevelCity {
            name: name.to_string(),
            position: Position::new(x, y),
            category,
            population,
        };
        let road = |from, to, lanes| LevelRoad { from, to, lanes };
        let component = |name: &str, amount, to| WaveComponent {
            class_name: name.to_string(),
            amount,
            to,
        };

        Level {
            cities: vec![
                city("Ashford", 0.0, 0.0, CityCategory::Residential, 120),
                city("Brookfield", 900.0, 0.0, CityCategory::Commercial, 40),
                city("Cinderton", 0.0, 700.0, CityCategory::Industrial, 30),
                city("Dunmere", 900.0, 700.0, CityCategory::Leisure, 20),
            ],
            roads: vec![
                road(0, 1, 3),
                road(1, 0, 3),
                road(0, 2, 2),
                road(2, 0, 2),
                road(0, 3, 1),
                road(3, 0, 1),
                road(1, 3, 2),
                road(2, 1, 1),
            ],
            waves: vec![
                vec![WaveFromCity {
                    from: 0,
                    vehicles: vec![
                        component("car", 12, CityCategory::Commercial),
                        component("car", 6, CityCategory::Industrial),
                    ],
                }],
                vec![
                    WaveFromCity {
                        from: 0,
                        vehicles: vec![
                            component("van", 6, CityCategory::Commercial),
                            component("car", 4, CityCategory::Leisure),
                        ],
                    },
                    WaveFromCity {
                        from: 2,
                        vehicles: vec![component("truck", 4, CityCategory::Commercial)],
                    },
                ],
                vec![WaveFromCity {
                    from: 1,
                    vehicles: vec![
                        component("car", 10, CityCategory::Residential),
                        component("truck", 3, CityCategory::Leisure),
                    ],
                }],
            ],
        }
    }
}
