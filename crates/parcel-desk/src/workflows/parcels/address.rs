use super::domain::Unit;

const BLOCKS: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "8"];

const APARTMENTS: [&str; 28] = [
    "201", "202", "203", "204", "301", "302", "303", "304", "401", "402", "403", "404", "501",
    "502", "503", "504", "601", "602", "603", "604", "701", "702", "703", "704", "801", "802",
    "803", "804",
];

/// Static roster of the blocks and apartments that make up the building.
#[derive(Debug, Clone)]
pub struct BuildingRoster {
    blocks: Vec<&'static str>,
    apartments: Vec<&'static str>,
}

impl BuildingRoster {
    /// Blocks 1 to 8, floors 2 to 8 with four apartments each.
    pub fn standard() -> Self {
        Self {
            blocks: BLOCKS.to_vec(),
            apartments: APARTMENTS.to_vec(),
        }
    }

    pub fn validate(&self, block: &str, apartment: &str) -> bool {
        self.blocks.contains(&block) && self.apartments.contains(&apartment)
    }

    pub fn contains(&self, unit: &Unit) -> bool {
        self.validate(&unit.block, &unit.apartment)
    }

    pub fn check(&self, unit: &Unit) -> Result<(), AddressError> {
        if self.contains(unit) {
            Ok(())
        } else {
            Err(AddressError::UnknownUnit {
                block: unit.block.clone(),
                apartment: unit.apartment.clone(),
            })
        }
    }

    /// Parses and validates in one step, for callers that do not re-prompt.
    pub fn resolve(&self, input: &str) -> Result<Unit, AddressError> {
        let unit = parse_address(input).ok_or_else(|| AddressError::Malformed {
            input: input.to_string(),
        })?;
        self.check(&unit)?;
        Ok(unit)
    }

    pub fn units(&self) -> impl Iterator<Item = Unit> + '_ {
        self.blocks.iter().flat_map(move |block| {
            self.apartments
                .iter()
                .map(move |apartment| Unit::new(*block, *apartment))
        })
    }

    /// Human-readable summary of the valid designators.
    pub fn describe(&self) -> String {
        let blocks = match (self.blocks.first(), self.blocks.last()) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "none".to_string(),
        };

        let mut floors: Vec<String> = Vec::new();
        for chunk in self.apartments.chunks(4) {
            if let (Some(first), Some(last)) = (chunk.first(), chunk.last()) {
                floors.push(format!("{first}-{last}"));
            }
        }

        format!("Blocks: {blocks}, Apartments: {}", floors.join(", "))
    }
}

/// Splits a token such as `4204` into block `4` and apartment `204`.
///
/// Only the shape is checked here: anything with at least two characters parses, and the
/// roster decides whether the unit exists.
pub fn parse_address(input: &str) -> Option<Unit> {
    let token = input.trim();
    let mut chars = token.chars();
    let block = chars.next()?;
    let apartment = chars.as_str();
    if apartment.is_empty() {
        return None;
    }

    Some(Unit::new(block.to_string(), apartment))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("'{input}' is not a block and apartment such as 4204 (block 4, apartment 204)")]
    Malformed { input: String },
    #[error("block {block} apartment {apartment} is not part of the building")]
    UnknownUnit { block: String, apartment: String },
}
