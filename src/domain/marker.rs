//! Environment marker expressions (PEP 508)

use serde::Serialize;
use std::fmt;

/// Variables a marker may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MarkerVariable {
    OsName,
    SysPlatform,
    PlatformMachine,
    PlatformPythonImplementation,
    PlatformRelease,
    PlatformSystem,
    PlatformVersion,
    PythonVersion,
    PythonFullVersion,
    ImplementationName,
    ImplementationVersion,
    Extra,
}

impl MarkerVariable {
    /// Look up a variable by name, accepting the legacy dotted spellings
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "os_name" | "os.name" => Some(MarkerVariable::OsName),
            "sys_platform" | "sys.platform" => Some(MarkerVariable::SysPlatform),
            "platform_machine" | "platform.machine" => Some(MarkerVariable::PlatformMachine),
            "platform_python_implementation"
            | "platform.python_implementation"
            | "python_implementation" => Some(MarkerVariable::PlatformPythonImplementation),
            "platform_release" => Some(MarkerVariable::PlatformRelease),
            "platform_system" => Some(MarkerVariable::PlatformSystem),
            "platform_version" | "platform.version" => Some(MarkerVariable::PlatformVersion),
            "python_version" => Some(MarkerVariable::PythonVersion),
            "python_full_version" => Some(MarkerVariable::PythonFullVersion),
            "implementation_name" => Some(MarkerVariable::ImplementationName),
            "implementation_version" => Some(MarkerVariable::ImplementationVersion),
            "extra" => Some(MarkerVariable::Extra),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerVariable::OsName => "os_name",
            MarkerVariable::SysPlatform => "sys_platform",
            MarkerVariable::PlatformMachine => "platform_machine",
            MarkerVariable::PlatformPythonImplementation => "platform_python_implementation",
            MarkerVariable::PlatformRelease => "platform_release",
            MarkerVariable::PlatformSystem => "platform_system",
            MarkerVariable::PlatformVersion => "platform_version",
            MarkerVariable::PythonVersion => "python_version",
            MarkerVariable::PythonFullVersion => "python_full_version",
            MarkerVariable::ImplementationName => "implementation_name",
            MarkerVariable::ImplementationVersion => "implementation_version",
            MarkerVariable::Extra => "extra",
        }
    }
}

/// Marker comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MarkerOp {
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
    Compatible,
    Arbitrary,
    In,
    NotIn,
}

impl MarkerOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerOp::Less => "<",
            MarkerOp::LessEqual => "<=",
            MarkerOp::Equal => "==",
            MarkerOp::NotEqual => "!=",
            MarkerOp::GreaterEqual => ">=",
            MarkerOp::Greater => ">",
            MarkerOp::Compatible => "~=",
            MarkerOp::Arbitrary => "===",
            MarkerOp::In => "in",
            MarkerOp::NotIn => "not in",
        }
    }

    /// Operator to use when the operands are swapped
    /// (`"3.8" <= python_version` is `python_version >= "3.8"`)
    pub fn flipped(&self) -> Option<Self> {
        match self {
            MarkerOp::Less => Some(MarkerOp::Greater),
            MarkerOp::LessEqual => Some(MarkerOp::GreaterEqual),
            MarkerOp::Greater => Some(MarkerOp::Less),
            MarkerOp::GreaterEqual => Some(MarkerOp::LessEqual),
            MarkerOp::Equal => Some(MarkerOp::Equal),
            MarkerOp::NotEqual => Some(MarkerOp::NotEqual),
            MarkerOp::Arbitrary => Some(MarkerOp::Arbitrary),
            MarkerOp::Compatible | MarkerOp::In | MarkerOp::NotIn => None,
        }
    }
}

/// Either side of a comparison
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MarkerValue {
    Variable(MarkerVariable),
    Literal(String),
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerValue::Variable(var) => f.write_str(var.as_str()),
            MarkerValue::Literal(text) => write!(f, "\"{}\"", text),
        }
    }
}

/// Boolean marker tree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MarkerExpr {
    Compare {
        lhs: MarkerValue,
        op: MarkerOp,
        rhs: MarkerValue,
    },
    And(Box<MarkerExpr>, Box<MarkerExpr>),
    Or(Box<MarkerExpr>, Box<MarkerExpr>),
}

impl MarkerExpr {
    /// `variable op "literal"`
    pub fn compare(variable: MarkerVariable, op: MarkerOp, literal: impl Into<String>) -> Self {
        MarkerExpr::Compare {
            lhs: MarkerValue::Variable(variable),
            op,
            rhs: MarkerValue::Literal(literal.into()),
        }
    }

    pub fn and(self, other: MarkerExpr) -> Self {
        MarkerExpr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: MarkerExpr) -> Self {
        MarkerExpr::Or(Box::new(self), Box::new(other))
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerExpr::Or(..) => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for MarkerExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerExpr::Compare { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op.as_str(), rhs),
            MarkerExpr::And(left, right) => {
                left.fmt_operand(f)?;
                f.write_str(" and ")?;
                right.fmt_operand(f)
            }
            MarkerExpr::Or(left, right) => write!(f, "{} or {}", left, right),
        }
    }
}
