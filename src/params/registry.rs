//! # Parameter Registry
//!
//! Current values of every simulation parameter, with typed access and
//! all-or-nothing configuration loading from TOML.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::schema::{index_of, GpsType, ParamDescriptor, ParamType, ParamValue, SCHEMA};
use crate::error::{Result, SitlError};

/// One parameter with its current value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamEntry {
    /// Persistence index, the position in the schema
    pub index: usize,
    pub descriptor: &'static ParamDescriptor,
    pub value: ParamValue,
}

impl ParamEntry {
    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn default_value(&self) -> ParamValue {
        self.descriptor.default
    }

    pub fn is_default(&self) -> bool {
        self.value == self.descriptor.default
    }
}

/// Tunable noise, fault and delay parameters consulted by sensor emulation
///
/// The set of parameters is fixed by [`SCHEMA`]; only values change. Values are
/// checked for type and width only, never for meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    values: Vec<ParamValue>,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationParameters {
    /// Create a table with every parameter at its default
    pub fn new() -> Self {
        Self {
            values: SCHEMA.iter().map(|descriptor| descriptor.default).collect(),
        }
    }

    /// Load defaults overlaid with a flat TOML parameter file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a file of `name = value` lines
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Any entry names an unknown parameter or has the wrong type
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sitl_bridge::params::SimulationParameters;
    ///
    /// let params = SimulationParameters::load("config/sim.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut params = Self::new();
        params.load_str(&contents)?;
        Ok(params)
    }

    /// Apply a flat TOML parameter document to this table
    ///
    /// Nothing is changed unless every entry is valid.
    ///
    /// Returns the number of parameters applied.
    pub fn load_str(&mut self, contents: &str) -> Result<usize> {
        let table: toml::Table = toml::from_str(contents)?;

        let batch = table
            .iter()
            .map(|(name, raw)| -> Result<(&'static str, ParamValue)> {
                let descriptor = &SCHEMA[lookup(name)?];
                Ok((descriptor.name, value_from_toml(descriptor, raw)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let applied = self.apply_batch(batch)?;
        info!("Loaded {} simulation parameters", applied);
        Ok(applied)
    }

    /// Render the current table as a flat TOML document
    ///
    /// Loading the output with [`SimulationParameters::load_str`] reproduces
    /// this table.
    pub fn to_toml_string(&self) -> Result<String> {
        let mut table = toml::Table::new();
        for entry in self.entries() {
            table.insert(entry.name().to_string(), value_to_toml(entry.value));
        }
        Ok(toml::to_string(&table)?)
    }

    /// Number of parameters in the schema
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Schema entry for a parameter
    pub fn descriptor(&self, name: &str) -> Result<&'static ParamDescriptor> {
        Ok(&SCHEMA[lookup(name)?])
    }

    /// Current value of a parameter
    pub fn get(&self, name: &str) -> Result<ParamValue> {
        Ok(self.values[lookup(name)?])
    }

    /// Set a parameter, checking that the value has its declared type
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<()> {
        let index = lookup(name)?;
        check_type(&SCHEMA[index], value)?;

        debug!("Setting {} = {}", name, value);
        self.values[index] = value;
        Ok(())
    }

    /// Set several parameters at once
    ///
    /// Every entry is validated before any value is written, so an unknown name
    /// or type mismatch anywhere in the batch leaves the table untouched. Later
    /// duplicates of a name win.
    ///
    /// Returns the number of entries applied.
    pub fn apply_batch<I, S>(&mut self, batch: I) -> Result<usize>
    where
        I: IntoIterator<Item = (S, ParamValue)>,
        S: AsRef<str>,
    {
        let mut checked = Vec::new();
        for (name, value) in batch {
            let index = lookup(name.as_ref())?;
            check_type(&SCHEMA[index], value)?;
            checked.push((index, value));
        }

        let applied = checked.len();
        for (index, value) in checked {
            self.values[index] = value;
        }
        Ok(applied)
    }

    /// Restore every parameter to its compiled-in default
    pub fn reset_to_defaults(&mut self) {
        for (value, descriptor) in self.values.iter_mut().zip(SCHEMA) {
            *value = descriptor.default;
        }
    }

    pub fn is_default(&self, name: &str) -> Result<bool> {
        let index = lookup(name)?;
        Ok(self.values[index] == SCHEMA[index].default)
    }

    /// All parameters in persistence order
    pub fn entries(&self) -> impl Iterator<Item = ParamEntry> + '_ {
        SCHEMA
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(index, (descriptor, &value))| ParamEntry { index, descriptor, value })
    }

    /// Value of a float parameter
    pub fn float(&self, name: &str) -> Result<f32> {
        match self.get(name)? {
            ParamValue::Float(v) => Ok(v),
            other => Err(mismatch(name, ParamType::Float, other)),
        }
    }

    /// Value of an integer parameter of either width
    pub fn int(&self, name: &str) -> Result<i32> {
        match self.get(name)? {
            ParamValue::Int8(v) => Ok(v.into()),
            ParamValue::Int16(v) => Ok(v.into()),
            other => Err(mismatch(name, ParamType::Int16, other)),
        }
    }

    /// Value of a vector parameter
    pub fn vector(&self, name: &str) -> Result<[f32; 3]> {
        match self.get(name)? {
            ParamValue::Vector3(v) => Ok(v),
            other => Err(mismatch(name, ParamType::Vector3, other)),
        }
    }

    /// Interpret `gps_type` as a GPS protocol
    ///
    /// # Errors
    ///
    /// Returns `InvalidGpsType` if the stored value names no known protocol.
    pub fn gps_type(&self) -> Result<GpsType> {
        match self.get("gps_type")? {
            ParamValue::Int8(raw) => GpsType::try_from(raw),
            other => Err(mismatch("gps_type", ParamType::Int8, other)),
        }
    }
}

fn lookup(name: &str) -> Result<usize> {
    index_of(name).ok_or_else(|| SitlError::UnknownParameter(name.to_string()))
}

fn mismatch(name: &str, expected: ParamType, found: ParamValue) -> SitlError {
    SitlError::TypeMismatch {
        name: name.to_string(),
        expected: expected.as_str(),
        found: found.param_type().as_str(),
    }
}

fn check_type(descriptor: &ParamDescriptor, value: ParamValue) -> Result<()> {
    if value.param_type() == descriptor.param_type() {
        Ok(())
    } else {
        Err(mismatch(descriptor.name, descriptor.param_type(), value))
    }
}

/// Convert a TOML value to a parameter's declared type
///
/// Floats accept integer literals; integers must fit the declared width.
fn value_from_toml(descriptor: &ParamDescriptor, raw: &toml::Value) -> Result<ParamValue> {
    let name = descriptor.name;
    let type_error = |raw: &toml::Value| SitlError::TypeMismatch {
        name: name.to_string(),
        expected: descriptor.param_type().as_str(),
        found: raw.type_str(),
    };
    let out_of_range = |value: i64| SitlError::ValueOutOfRange {
        name: name.to_string(),
        value,
    };

    match (descriptor.param_type(), raw) {
        (ParamType::Float, _) => as_f32(raw).map(ParamValue::Float).ok_or_else(|| type_error(raw)),
        (ParamType::Int8, toml::Value::Integer(v)) => i8::try_from(*v)
            .map(ParamValue::Int8)
            .map_err(|_| out_of_range(*v)),
        (ParamType::Int16, toml::Value::Integer(v)) => i16::try_from(*v)
            .map(ParamValue::Int16)
            .map_err(|_| out_of_range(*v)),
        (ParamType::Vector3, toml::Value::Array(items)) if items.len() == 3 => {
            let mut vector = [0.0f32; 3];
            for (slot, item) in vector.iter_mut().zip(items) {
                *slot = as_f32(item).ok_or_else(|| type_error(item))?;
            }
            Ok(ParamValue::Vector3(vector))
        }
        _ => Err(type_error(raw)),
    }
}

fn as_f32(raw: &toml::Value) -> Option<f32> {
    match raw {
        toml::Value::Float(v) => Some(*v as f32),
        toml::Value::Integer(v) => Some(*v as f32),
        _ => None,
    }
}

fn value_to_toml(value: ParamValue) -> toml::Value {
    match value {
        ParamValue::Float(v) => toml::Value::Float(v.into()),
        ParamValue::Int8(v) => toml::Value::Integer(v.into()),
        ParamValue::Int16(v) => toml::Value::Integer(v.into()),
        ParamValue::Vector3(v) => {
            toml::Value::Array(v.iter().map(|&c| toml::Value::Float(c.into())).collect())
        }
    }
}
