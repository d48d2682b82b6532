// Copyright 2021 UMD Database Group. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The generated entities: `Patient`, `Sample`, and `Detection`.

use crate::catalog::Catalog;
use crate::config::{GeneratorConfig, PATIENT_PREFIX, SAMPLE_PREFIX};
use crate::ident::IdentifierRng;
use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Declares a closed value domain. The string form of every variant is the
/// literal stored in the database `ENUM` column.
macro_rules! value_domain {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $literal:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Serialize, Deserialize, Debug, Hash)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $literal)] $variant),+
        }

        impl $name {
            /// Every value of the domain.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The database literal.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $literal),+
                }
            }

            /// Returns a value uniformly at random.
            pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
                Self::ALL[rng.gen_range(0..Self::ALL.len())]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

value_domain! {
    /// How the patient was born.
    BirthType {
        /// Cesarean section.
        Cesarean => "Cesarean",
        /// Vaginal delivery.
        Natural => "Natural",
    }
}

value_domain! {
    /// The world region the patient lives in.
    Location {
        /// Europe.
        Europe => "Europe",
        /// Africa.
        Africa => "Africa",
        /// North America.
        NorthAmerica => "North America",
        /// South America.
        SouthAmerica => "South America",
        /// Central Asia.
        CentralAsia => "Central Asia",
        /// East Asia.
        EastAsia => "East Asia",
        /// Antarctica.
        Antarctica => "Antarctica",
        /// Southeast Asia.
        SoutheastAsia => "Southeast Asia",
        /// Middle East.
        MiddleEast => "Middle East",
        /// Oceania.
        Oceania => "Oceania",
    }
}

value_domain! {
    /// The patient's activity level.
    Lifestyle {
        /// Physically active.
        Active => "Active",
        /// Sedentary.
        Sedentary => "Sedentary",
    }
}

value_domain! {
    /// The patient's sex.
    Sex {
        /// Male.
        M => "M",
        /// Female.
        F => "F",
    }
}

value_domain! {
    /// Where on the body a sample was collected.
    BodyPart {
        /// Head.
        Head => "Head",
        /// Chest.
        Chest => "Chest",
        /// Arm.
        Arm => "Arm",
        /// Leg.
        Leg => "Leg",
        /// Foot.
        Foot => "Foot",
        /// Hand.
        Hand => "Hand",
    }
}

value_domain! {
    /// The kind of biological material in a sample.
    SampleType {
        /// Blood.
        Blood => "Blood",
        /// Tissue.
        Tissue => "Tissue",
        /// Saliva.
        Saliva => "Saliva",
        /// Urine.
        Urine => "Urine",
    }
}

/// A simulated individual. The disease is not part of the patient as drawn: it
/// is derived later from the microorganisms found in the patient's samples.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Hash)]
pub struct Patient {
    /// `PAC-DDDDD-LLL`.
    pub id:         String,
    /// Age in years.
    pub age:        u32,
    /// How the patient was born.
    pub birth_type: BirthType,
    /// Where the patient lives.
    pub location:   Location,
    /// The patient's activity level.
    pub lifestyle:  Lifestyle,
    /// The patient's sex.
    pub sex:        Sex,
}

impl Patient {
    /// Creates a new random `Patient`. Every field is drawn independently and
    /// uniformly from its domain.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, cfg: &GeneratorConfig) -> Self {
        Patient {
            id:         rng.gen_identifier(PATIENT_PREFIX),
            age:        rng.gen_range(cfg.age_min..=cfg.age_max),
            birth_type: BirthType::random(rng),
            location:   Location::random(rng),
            lifestyle:  Lifestyle::random(rng),
            sex:        Sex::random(rng),
        }
    }
}

/// A biological sample taken from a patient.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Hash)]
pub struct Sample {
    /// `SMP-DDDDD-LLL`.
    pub id:          String,
    /// Collection date.
    pub date:        NaiveDate,
    /// Where the sample was collected.
    pub body_part:   BodyPart,
    /// What the sample consists of.
    pub sample_type: SampleType,
}

impl Sample {
    /// Creates a new random `Sample`.
    ///
    /// The collection date is uniform over the second-granularity offset from
    /// the first date, both ends of the window included, and then truncated to
    /// its calendar day.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, cfg: &GeneratorConfig) -> Self {
        let id = rng.gen_identifier(SAMPLE_PREFIX);
        // The window ends at the last second of the last day.
        let span = (cfg.last_date - cfg.first_date).num_seconds() + SECONDS_PER_DAY - 1;
        let offset = rng.gen_range(0..=span);
        Sample {
            id,
            date: cfg.first_date + Duration::days(offset / SECONDS_PER_DAY),
            body_part: BodyPart::random(rng),
            sample_type: SampleType::random(rng),
        }
    }
}

/// A microorganism detected in a sample.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Hash)]
pub struct Detection {
    /// The catalog identifier of the microorganism.
    pub microorganism: String,
    /// One of the diseases the catalog associates with the microorganism.
    pub disease:       Option<String>,
    /// The qPCR copy count.
    pub qpcr:          u32,
}

impl Detection {
    /// Creates a new random `Detection`: a uniform catalog row, a uniform
    /// disease of that row, and a uniform qPCR value.
    ///
    /// Returns `None` only if the catalog is empty.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        catalog: &Catalog,
        cfg: &GeneratorConfig,
    ) -> Option<Self> {
        let entry = catalog.choose(rng)?;
        let disease = entry.choose_disease(rng).cloned();
        Some(Detection {
            microorganism: entry.id.clone(),
            disease,
            qpcr: rng.gen_range(cfg.qpcr_min..=cfg.qpcr_max),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::config::Config;
    use crate::ident::is_identifier;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn config() -> GeneratorConfig {
        GeneratorConfig::new(&Config::new()).unwrap()
    }

    #[test]
    fn test_domains() {
        assert_eq!(BirthType::ALL.len(), 2);
        assert_eq!(Location::ALL.len(), 10);
        assert_eq!(Lifestyle::ALL.len(), 2);
        assert_eq!(Sex::ALL.len(), 2);
        assert_eq!(BodyPart::ALL.len(), 6);
        assert_eq!(SampleType::ALL.len(), 4);
        assert_eq!(Location::SoutheastAsia.as_str(), "Southeast Asia");
        assert_eq!(format!("{}", BirthType::Cesarean), "Cesarean");
        assert_eq!(
            serde_json::to_string(&Location::NorthAmerica).unwrap(),
            "\"North America\""
        );
    }

    #[test]
    fn test_random_patients() {
        let cfg = config();
        let mut rng = SmallRng::seed_from_u64(1u64);
        let patients = (0..500)
            .map(|_| Patient::random(&mut rng, &cfg))
            .collect::<Vec<_>>();
        assert!(patients.iter().all(|p| p.age <= 100));
        assert!(patients.iter().all(|p| is_identifier(&p.id, "PAC")));
        let locations = patients.iter().map(|p| p.location).collect::<HashSet<_>>();
        assert_eq!(locations.len(), Location::ALL.len());
    }

    #[test]
    fn test_random_samples() {
        let cfg = config();
        let mut rng = SmallRng::seed_from_u64(2u64);
        for _ in 0..1000 {
            let sample = Sample::random(&mut rng, &cfg);
            assert!(is_identifier(&sample.id, "SMP"));
            assert!(sample.date >= cfg.first_date && sample.date <= cfg.last_date);
        }
    }

    #[test]
    fn test_single_day_window() {
        let mut config = Config::new();
        config.insert("first-date", "2020-02-29".to_string());
        config.insert("last-date", "2020-02-29".to_string());
        let cfg = GeneratorConfig::new(&config).unwrap();
        let mut rng = SmallRng::seed_from_u64(9u64);
        let sample = Sample::random(&mut rng, &cfg);
        assert_eq!(sample.date, NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
    }

    #[test]
    fn test_both_window_ends_are_drawn() {
        let mut config = Config::new();
        config.insert("first-date", "2023-12-30".to_string());
        config.insert("last-date", "2023-12-31".to_string());
        let cfg = GeneratorConfig::new(&config).unwrap();
        let mut rng = SmallRng::seed_from_u64(4u64);
        let dates = (0..200)
            .map(|_| Sample::random(&mut rng, &cfg).date)
            .collect::<HashSet<_>>();
        assert_eq!(dates.len(), 2);
        assert!(dates.contains(&cfg.last_date));

        // Over the default window the last day is as likely as any other.
        let cfg = self::config();
        let mut rng = SmallRng::seed_from_u64(5u64);
        let last_day = (0..200_000)
            .filter(|_| Sample::random(&mut rng, &cfg).date == cfg.last_date)
            .count();
        assert!(last_day > 0);
    }

    #[test]
    fn test_random_detection() {
        let cfg = config();
        let catalog = Catalog::new(vec![CatalogEntry::new("M1", "Virus", "Influenza", "Flu")]);
        let mut rng = SmallRng::seed_from_u64(3u64);
        for _ in 0..100 {
            let detection = Detection::random(&mut rng, &catalog, &cfg).unwrap();
            assert_eq!(detection.microorganism, "M1");
            assert_eq!(detection.disease.as_deref(), Some("Flu"));
            assert!((50..=1000).contains(&detection.qpcr));
        }

        assert_eq!(Detection::random(&mut rng, &Catalog::default(), &cfg), None);
    }
}
