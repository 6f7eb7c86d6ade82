//! Parse simulation configuration files
//!
//! Simulation parameters (population counts, value ranges, coordinate
//! file locations, thresholds) are specified in a YAML file whose
//! numeric fields may be mathematical expressions, evaluated against
//! user-defined constants and a set of built-in functions and units.

use std::convert::TryFrom;
use std::fmt;
use std::error::Error;
use std::path::Path;

use yaml_rust::{YamlLoader, yaml::Yaml};
use evalexpr::*;

/// Why did Config::read fail?
pub enum InputError {
    /// The file could not be opened or was not valid YAML.
    File,
    /// A component of the requested path is missing.
    Location(String, String),
    /// The field exists but could not be parsed as the target type.
    Conversion(String, String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InputError::File => write!(f, "unable to open or parse the configuration file"),
            InputError::Location(path, component) => {
                write!(f, "failed to follow path \"{}\": component \"{}\" is missing", path, component)
            },
            InputError::Conversion(path, field) => {
                write!(f, "could not convert \"{}\" at \"{}\" to the target type", field, path)
            },
        }
    }
}

impl fmt::Debug for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for InputError {}

impl InputError {
    fn location(path: &str, component: &str) -> Self {
        Self::Location(path.to_owned(), component.to_owned())
    }

    fn conversion(path: &str, field: &str) -> Self {
        Self::Conversion(path.to_owned(), field.to_owned())
    }
}

/// Types that can be parsed from a field of the configuration file.
pub trait FromYaml: Sized {
    fn from_yaml(arg: Yaml, ctx: &HashMapContext) -> Result<Self, ()>;
}

impl FromYaml for bool {
    fn from_yaml(arg: Yaml, _ctx: &HashMapContext) -> Result<Self, ()> {
        match arg {
            Yaml::Boolean(b) => Ok(b),
            _ => Err(()),
        }
    }
}

impl FromYaml for String {
    fn from_yaml(arg: Yaml, _ctx: &HashMapContext) -> Result<Self, ()> {
        match arg {
            Yaml::String(s) | Yaml::Real(s) => Ok(s),
            Yaml::Integer(i) => Ok(i.to_string()),
            Yaml::Boolean(b) => Ok(b.to_string()),
            _ => Err(()),
        }
    }
}

impl FromYaml for f64 {
    fn from_yaml(arg: Yaml, ctx: &HashMapContext) -> Result<Self, ()> {
        match arg {
            Yaml::Real(s) => s.parse::<f64>().or(Err(())),
            Yaml::Integer(i) => Ok(i as f64),
            Yaml::String(s) => eval_number_with_context(&s, ctx).or(Err(())),
            _ => Err(()),
        }
    }
}

impl FromYaml for i64 {
    fn from_yaml(arg: Yaml, _ctx: &HashMapContext) -> Result<Self, ()> {
        match arg {
            Yaml::Integer(i) => Ok(i),
            _ => Err(()),
        }
    }
}

impl FromYaml for usize {
    fn from_yaml(arg: Yaml, ctx: &HashMapContext) -> Result<Self, ()> {
        let i: i64 = FromYaml::from_yaml(arg, ctx)?;
        usize::try_from(i).map_err(|_| ())
    }
}

impl FromYaml for Vec<f64> {
    fn from_yaml(arg: Yaml, ctx: &HashMapContext) -> Result<Self, ()> {
        match arg {
            Yaml::Array(array) => array.into_iter()
                .map(|y| FromYaml::from_yaml(y, ctx))
                .collect(),
            // a bare scalar reads as a vec of length 1
            y => FromYaml::from_yaml(y, ctx).map(|x| vec![x]),
        }
    }
}

/// Represents the simulation configuration: parameter values, and
/// any constants defined for use in parameter expressions.
pub struct Config {
    input: Yaml,
    ctx: HashMapContext,
}

impl Config {
    /// Loads a configuration file.
    /// Fails if the file cannot be opened or if it is not
    /// YAML-formatted.
    pub fn from_file(path: &Path) -> Result<Self, InputError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|_| InputError::File)?;
        Self::from_string(&contents)
    }

    /// Loads a YAML configuration from a string.
    /// Fails if the string is not formatted correctly.
    pub fn from_string(s: &str) -> Result<Self, InputError> {
        let input = YamlLoader::load_from_str(s)
            .map_err(|_| InputError::File)?;
        let input = input.first()
            .ok_or(InputError::File)?;

        Ok(Config {
            input: input.clone(),
            ctx: HashMapContext::new(),
        })
    }

    /// Loads automatic values for mathematical functions, angular
    /// units and constants, then reads and evaluates any definitions
    /// in the specified `section` of the configuration, making them
    /// available to expressions elsewhere in the file.
    pub fn with_context(&mut self, section: &str) -> Result<&mut Self, InputError> {
        use helper::context_function;

        let mut ctx = context_map! {
            "pi" => std::f64::consts::PI,
            "degree" => std::f64::consts::PI / 180.0,
            "arcmin" => std::f64::consts::PI / (180.0 * 60.0),
            "arcsec" => std::f64::consts::PI / (180.0 * 3600.0),
            "kilo" => 1.0e3,
            "mega" => 1.0e6,
            "giga" => 1.0e9,
            "milli" => 1.0e-3,
            "micro" => 1.0e-6,
        }.unwrap();

        context_function!(ctx, "sqrt",  f64::sqrt);
        context_function!(ctx, "abs",   f64::abs);
        context_function!(ctx, "exp",   f64::exp);
        context_function!(ctx, "ln",    f64::ln);
        context_function!(ctx, "log10", f64::log10);
        context_function!(ctx, "sin",   f64::sin);
        context_function!(ctx, "cos",   f64::cos);
        context_function!(ctx, "tan",   f64::tan);
        context_function!(ctx, "floor", f64::floor);
        context_function!(ctx, "ceil",  f64::ceil);

        self.ctx = ctx;

        if self.input[section].is_badvalue() {
            return Ok(self);
        }

        for (a, b) in self.input[section].as_hash().ok_or(InputError::File)? {
            let (key, value) = match (a, b) {
                (Yaml::String(k), Yaml::Integer(i)) => (Some(k), Some(*i as f64)),
                (Yaml::String(k), Yaml::Real(s)) => (Some(k), s.parse::<f64>().ok()),
                (Yaml::String(k), Yaml::String(s)) => (Some(k), eval_number_with_context(s, &self.ctx).ok()),
                _ => (None, None),
            };

            if let Some(v) = value {
                let key = key.unwrap(); // if value.is_some() so is key
                self.ctx.set_value(key.clone(), Value::from(v))
                    .map_err(|_| InputError::conversion(section, key))?
            } else if let Some(k) = key {
                // found a key-value pair but parsing failed
                return Err(InputError::conversion(section, k));
            }
        }

        Ok(self)
    }

    /// Locates a key-value pair in the configuration file and
    /// attempts to parse the value as the specified type. The path
    /// to the pair is a string of colon-separated sections, e.g.
    /// `'galaxies:scalelength:min'`.
    pub fn read<T, S>(&self, path: S) -> Result<T, InputError>
    where
        T: FromYaml,
        S: AsRef<str>,
    {
        let address: Vec<&str> = path.as_ref().split(':').collect();
        let value = address.iter()
            .try_fold(&self.input, |y, s| {
                if y[*s].is_badvalue() {
                    Err(InputError::location(path.as_ref(), s))
                } else {
                    Ok(&y[*s])
                }
            });
        value.and_then(|arg| {
            T::from_yaml(arg.clone(), &self.ctx)
                .map_err(|_| InputError::conversion(path.as_ref(), address.last().unwrap()))
        })
    }

    /// Like `Config::read`, but parses the value as a function of a
    /// single variable `arg`. This is how user-defined densities and
    /// cumulative distribution functions reach the samplers.
    pub fn func<'a, S: AsRef<str> + Sync + 'a>(&'a self, path: S, arg: S) -> Result<impl Fn(f64) -> f64 + Sync + 'a, InputError> {
        let s: String = self.read(&path)?;

        let tree = build_operator_tree(&s)
            .map_err(|_| InputError::conversion(path.as_ref(), &s))?;

        // every identifier must be the function argument or a known
        // constant, otherwise evaluation would fail at sample time
        for var in tree.iter_read_variable_identifiers() {
            if var == arg.as_ref() || self.ctx.iter_variable_names().any(|id| var == id) {
                continue;
            } else {
                return Err(InputError::conversion(path.as_ref(), &s));
            }
        }

        let func = move |x| {
            let name = arg.as_ref().to_owned();
            let mut ctx = self.ctx.clone();
            ctx.set_value(name, Value::from(x)).unwrap();
            tree.eval_number_with_context(&ctx).unwrap()
        };

        Ok(func)
    }

    /// Parses a string argument and evaluates it using the default
    /// context, extending `str::parse::<f64>` to handle mathematical
    /// expressions such as `"0.3 / (1.0 + median)"`, where 'median'
    /// is a constant specified in the input file.
    pub fn evaluate<S: AsRef<str>>(&self, arg: S) -> Option<f64> {
        eval_number_with_context(arg.as_ref(), &self.ctx).ok()
    }
}

mod helper {
    macro_rules! context_function {
        ($ctx:expr, $name:literal, $func:expr) => {
            $ctx.set_function(
                $name.to_string(),
                Function::new(|arg| {
                    let x = arg.as_number()?;
                    Ok(Value::Float($func(x)))
                })
            ).unwrap()
        };
    }

    pub(super) use context_function;
}
