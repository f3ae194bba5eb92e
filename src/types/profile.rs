use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A user's nutrition profile as the backend returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Free-text fitness goals.
    #[serde(default)]
    pub fitness_goals: Option<String>,

    /// Free-text dietary restrictions.
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
}

/// The two editable profile fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    /// `fitness_goals`
    FitnessGoals,
    /// `dietary_restrictions`
    DietaryRestrictions,
}

impl ProfileField {
    /// Every field, in display order.
    pub const ALL: [ProfileField; 2] = [ProfileField::FitnessGoals, ProfileField::DietaryRestrictions];

    /// The wire name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            ProfileField::FitnessGoals => "fitness_goals",
            ProfileField::DietaryRestrictions => "dietary_restrictions",
        }
    }

    /// The human label of the field ("Fitness Goals").
    pub fn label(&self) -> &'static str {
        match self {
            ProfileField::FitnessGoals => "Fitness Goals",
            ProfileField::DietaryRestrictions => "Dietary Restrictions",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProfileField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fitness_goals" | "goals" => Ok(ProfileField::FitnessGoals),
            "dietary_restrictions" | "restrictions" => Ok(ProfileField::DietaryRestrictions),
            _ => Err(format!("Unknown profile field: {s}")),
        }
    }
}

/// The profile editor's form state.  Always sent to the backend whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileForm {
    /// Free-text fitness goals.
    pub fitness_goals: String,
    /// Free-text dietary restrictions.
    pub dietary_restrictions: String,
}

impl ProfileForm {
    /// Returns the value of one field.
    pub fn get(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::FitnessGoals => &self.fitness_goals,
            ProfileField::DietaryRestrictions => &self.dietary_restrictions,
        }
    }

    /// Overwrites one field.
    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) {
        match field {
            ProfileField::FitnessGoals => self.fitness_goals = value.into(),
            ProfileField::DietaryRestrictions => self.dietary_restrictions = value.into(),
        }
    }

    /// A readable summary with "Not provided" for blank fields.
    pub fn summary(&self) -> String {
        let mut lines = vec!["User Profile Context".to_string()];
        for field in ProfileField::ALL {
            let value = self.get(field).trim();
            let value = if value.is_empty() { "Not provided" } else { value };
            lines.push(format!("- {}: {}", field.label(), value));
        }
        lines.join("\n")
    }
}

impl From<Profile> for ProfileForm {
    fn from(profile: Profile) -> Self {
        Self {
            fitness_goals: profile.fitness_goals.unwrap_or_default(),
            dietary_restrictions: profile.dietary_restrictions.unwrap_or_default(),
        }
    }
}
