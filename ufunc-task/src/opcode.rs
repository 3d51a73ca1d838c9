//! Operation codes and task ids.
//!
//! A task id packs the operation, the element type and the variant:
//!
//! ```text
//! id = op * TYPE_OFFSET + dtype * MAX_VARIANTS + variant
//! TYPE_OFFSET = DType::COUNT * MAX_VARIANTS
//! ```
//!
//! Each reduction operator owns three operation codes: its reduce code
//! (axis collapse, whole partition, scalar fold), its elementwise code
//! (combine with an array, a broadcast scalar or another scalar) and its
//! radix code (reduction tree node).

use ufunc_traits::{DType, ReductionKind};

/// Number of variant slots per (operation, element type) pair.
pub const MAX_VARIANTS: u32 = 4;

/// Id distance between consecutive operation codes.
pub const TYPE_OFFSET: u32 = DType::COUNT * MAX_VARIANTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Variant {
    Normal = 0,
    Scalar = 1,
    Broadcast = 2,
    Reduction = 3,
}

impl Variant {
    pub const ALL: [Variant; MAX_VARIANTS as usize] =
        [Variant::Normal, Variant::Scalar, Variant::Broadcast, Variant::Reduction];

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// What an operation code does with its reduction operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpRole {
    Reduce,
    Elementwise,
    Radix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum OpCode {
    Max = 1,
    Maximum = 2,
    MaxRadix = 3,
    Min = 4,
    Minimum = 5,
    MinRadix = 6,
    Sum = 7,
    Add = 8,
    SumRadix = 9,
    Prod = 10,
    Multiply = 11,
    ProdRadix = 12,
}

impl OpCode {
    pub const ALL: [OpCode; 12] = [
        OpCode::Max,
        OpCode::Maximum,
        OpCode::MaxRadix,
        OpCode::Min,
        OpCode::Minimum,
        OpCode::MinRadix,
        OpCode::Sum,
        OpCode::Add,
        OpCode::SumRadix,
        OpCode::Prod,
        OpCode::Multiply,
        OpCode::ProdRadix,
    ];

    pub fn new(kind: ReductionKind, role: OpRole) -> Self {
        let base = match kind {
            ReductionKind::Max => 1,
            ReductionKind::Min => 4,
            ReductionKind::Sum => 7,
            ReductionKind::Prod => 10,
        };
        let code = base
            + match role {
                OpRole::Reduce => 0,
                OpRole::Elementwise => 1,
                OpRole::Radix => 2,
            };
        Self::ALL[code as usize - 1]
    }

    pub fn reduce(kind: ReductionKind) -> Self {
        Self::new(kind, OpRole::Reduce)
    }

    pub fn elementwise(kind: ReductionKind) -> Self {
        Self::new(kind, OpRole::Elementwise)
    }

    pub fn radix(kind: ReductionKind) -> Self {
        Self::new(kind, OpRole::Radix)
    }

    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        code.checked_sub(1).and_then(|i| Self::ALL.get(i as usize).copied())
    }

    /// The reduction operator this code applies.
    pub fn kind(self) -> ReductionKind {
        ReductionKind::ALL[(self.code() as usize - 1) / 3]
    }

    pub fn role(self) -> OpRole {
        match (self.code() - 1) % 3 {
            0 => OpRole::Reduce,
            1 => OpRole::Elementwise,
            _ => OpRole::Radix,
        }
    }
}

/// The task bodies, one per (operation role, variant) pair in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Fold one axis of the input into a seeded output.
    AxisCollapse,
    /// Fold a whole partition into a scalar.
    WholePartition,
    /// Fold two scalar futures.
    ReductionScalar,
    /// Combine two arrays.
    Combine,
    /// Combine an array with a scalar future.
    CombineBroadcast,
    /// Combine two scalar futures.
    CombineScalar,
    /// Fold up to radix partial results.
    RadixFanIn,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::AxisCollapse,
        TaskKind::WholePartition,
        TaskKind::ReductionScalar,
        TaskKind::Combine,
        TaskKind::CombineBroadcast,
        TaskKind::CombineScalar,
        TaskKind::RadixFanIn,
    ];

    pub fn role(self) -> OpRole {
        match self {
            TaskKind::AxisCollapse | TaskKind::WholePartition | TaskKind::ReductionScalar => OpRole::Reduce,
            TaskKind::Combine | TaskKind::CombineBroadcast | TaskKind::CombineScalar => OpRole::Elementwise,
            TaskKind::RadixFanIn => OpRole::Radix,
        }
    }

    pub fn variant(self) -> Variant {
        match self {
            TaskKind::AxisCollapse | TaskKind::Combine | TaskKind::RadixFanIn => Variant::Normal,
            TaskKind::ReductionScalar | TaskKind::CombineScalar => Variant::Scalar,
            TaskKind::CombineBroadcast => Variant::Broadcast,
            TaskKind::WholePartition => Variant::Reduction,
        }
    }

    pub fn from_parts(role: OpRole, variant: Variant) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.role() == role && k.variant() == variant)
    }

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::AxisCollapse => "axis_collapse",
            TaskKind::WholePartition => "whole_partition",
            TaskKind::ReductionScalar => "reduction_scalar",
            TaskKind::Combine => "combine",
            TaskKind::CombineBroadcast => "combine_broadcast",
            TaskKind::CombineScalar => "combine_scalar",
            TaskKind::RadixFanIn => "radix_fan_in",
        }
    }
}

/// Host-visible task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u32);

impl TaskId {
    pub fn encode(op: OpCode, dtype: DType, variant: Variant) -> Self {
        TaskId(op.code() * TYPE_OFFSET + dtype.code() * MAX_VARIANTS + variant as u32)
    }

    /// Id of `kind` for the reduction operator `reduction` over `dtype`.
    pub fn of(reduction: ReductionKind, kind: TaskKind, dtype: DType) -> Self {
        Self::encode(OpCode::new(reduction, kind.role()), dtype, kind.variant())
    }

    /// Split an id into its parts; `None` when any part is out of range.
    pub fn decode(self) -> Option<(OpCode, DType, Variant)> {
        let op = OpCode::from_code(self.0 / TYPE_OFFSET)?;
        let rest = self.0 % TYPE_OFFSET;
        let dtype = DType::from_code(rest / MAX_VARIANTS)?;
        let variant = Variant::from_code(rest % MAX_VARIANTS)?;
        Some((op, dtype, variant))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
