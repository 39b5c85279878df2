use std::str::FromStr;

use strum::{EnumCount, IntoEnumIterator};

use crate::error::{DispatchError, DispatchResult};

/// Syntactic construct kinds reported by the event producer.
///
/// The set is flat: kinds carry no hierarchy, nesting only exists in the
/// order the producer opens and closes them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::EnumCount,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ConstructKind {
    Decl,
    Expr,
    Parameter,
    DeclStmt,
    ExprStmt,
    ParameterList,
    ArgumentList,
    ArgumentListTemplate,
    Call,
    Templates,
    CtrlFlow,
    EndFlow,
    GenericArgumentList,
    Name,
    Function,
    FunctionDecl,
    Constructor,
    ConstructorDecl,
    DestructorDecl,
    Destructor,
    Argument,
    Index,
    Block,
    Type,
    Init,
    Op,
    Literal,
    Modifier,
    MemberList,
    ClassN,
    StructN,
    #[strum(serialize = "super_list")]
    SuperList,
    Super,
    PublicAccess,
    PrivateAccess,
    ProtectedAccess,
    Preproc,
    WhileStmt,
    ForStmt,
    IfStmt,
    NonTerminal,
    Macro,
    ClassBlock,
    FunctionBlock,
    Specifier,
    TypedefExpr,
    Empty,
    TokenString,
    IfBlock,
    WhileBlock,
    ForBlock,
}

/// Kinds that get a no-op handler in both tables of a fresh listener.
const DEFAULT_NOP_KINDS: &[ConstructKind] = &[
    ConstructKind::DeclStmt,
    ConstructKind::ExprStmt,
    ConstructKind::ParameterList,
    ConstructKind::IfStmt,
    ConstructKind::ForStmt,
    ConstructKind::WhileStmt,
    ConstructKind::Templates,
    ConstructKind::ArgumentList,
    ConstructKind::Call,
    ConstructKind::Function,
    ConstructKind::Constructor,
    ConstructKind::FunctionDecl,
    ConstructKind::DestructorDecl,
    ConstructKind::ConstructorDecl,
    ConstructKind::ClassN,
    ConstructKind::StructN,
    ConstructKind::PublicAccess,
    ConstructKind::ProtectedAccess,
    ConstructKind::PrivateAccess,
    ConstructKind::Destructor,
    ConstructKind::Parameter,
    ConstructKind::MemberList,
    ConstructKind::Index,
    ConstructKind::Op,
    ConstructKind::Block,
    ConstructKind::Init,
    ConstructKind::Argument,
    ConstructKind::Literal,
    ConstructKind::Modifier,
    ConstructKind::Decl,
    ConstructKind::Type,
    ConstructKind::TypedefExpr,
    ConstructKind::Expr,
    ConstructKind::Name,
    ConstructKind::Macro,
    ConstructKind::Specifier,
];

impl ConstructKind {
    /// Dense index into per-kind tables such as the trigger field.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn all() -> impl Iterator<Item = ConstructKind> {
        ConstructKind::iter()
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Kinds a freshly created listener carries no-op handlers for.
    ///
    /// Token strings only ever get a close default, since that is where
    /// the token text is settled.
    pub fn default_nop_kinds(phase: Phase) -> Vec<ConstructKind> {
        let mut kinds = DEFAULT_NOP_KINDS.to_vec();
        if phase == Phase::Close {
            kinds.push(ConstructKind::TokenString);
        }
        kinds
    }

    pub fn parse(raw: &str) -> DispatchResult<Self> {
        ConstructKind::from_str(raw.trim()).map_err(|_| DispatchError::UnknownConstruct {
            raw: raw.to_string(),
        })
    }
}

pub const CONSTRUCT_COUNT: usize = ConstructKind::COUNT;

/// Open/close marker paired with every construct occurrence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Phase {
    Open,
    Close,
}

impl Phase {
    /// Decodes a textual phase. Anything but open/close is fatal.
    pub fn parse(raw: &str) -> DispatchResult<Self> {
        Phase::from_str(raw.trim()).map_err(|_| DispatchError::InvalidPhase {
            raw: raw.to_string(),
        })
    }
}

impl TryFrom<u8> for Phase {
    type Error = DispatchError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Phase::Open),
            1 => Ok(Phase::Close),
            other => Err(DispatchError::InvalidPhase {
                raw: other.to_string(),
            }),
        }
    }
}
