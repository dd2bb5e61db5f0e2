//! Scenario text format
//!
//! ```text
//! # comment
//! step_length 0.4
//! pedestrian <id> <x> <y> <speed> <target_x> <target_y>
//! ```

use std::collections::HashSet;
use std::str::FromStr;

use super::Pedestrian;
use crate::error::{Result, TraciError};
use crate::protocol::Vec2;

/// Contents of a scenario file
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub step_length: Option<f64>,
    pub pedestrians: Vec<Pedestrian>,
}

/// Parse scenario text
pub fn parse_scenario(content: &str) -> Result<Scenario> {
    let mut scenario = Scenario::default();
    let mut seen = HashSet::new();

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields[0] {
            "step_length" => {
                expect_fields(&fields, 2, line_no)?;
                let step_length: f64 = field(fields[1], "step_length", line_no)?;
                if !(step_length > 0.0) {
                    return Err(TraciError::Scenario(format!(
                        "line {}: step_length must be positive",
                        line_no
                    )));
                }
                scenario.step_length = Some(step_length);
            }
            "pedestrian" => {
                expect_fields(&fields, 7, line_no)?;
                let id: i32 = field(fields[1], "id", line_no)?;
                if !seen.insert(id) {
                    return Err(TraciError::Scenario(format!(
                        "line {}: duplicate pedestrian id {}",
                        line_no, id
                    )));
                }
                let position = Vec2::new(field(fields[2], "x", line_no)?, field(fields[3], "y", line_no)?);
                let speed: f64 = field(fields[4], "speed", line_no)?;
                let target = Vec2::new(
                    field(fields[5], "target_x", line_no)?,
                    field(fields[6], "target_y", line_no)?,
                );
                scenario.pedestrians.push(Pedestrian::new(id, position, speed, target));
            }
            other => {
                return Err(TraciError::Scenario(format!(
                    "line {}: unknown directive '{}'",
                    line_no, other
                )))
            }
        }
    }

    Ok(scenario)
}

fn expect_fields(fields: &[&str], count: usize, line_no: usize) -> Result<()> {
    if fields.len() != count {
        return Err(TraciError::Scenario(format!(
            "line {}: '{}' takes {} values, got {}",
            line_no,
            fields[0],
            count - 1,
            fields.len() - 1
        )));
    }
    Ok(())
}

fn field<T: FromStr>(raw: &str, name: &str, line_no: usize) -> Result<T> {
    raw.parse().map_err(|_| {
        TraciError::Scenario(format!("line {}: invalid {} '{}'", line_no, name, raw))
    })
}
