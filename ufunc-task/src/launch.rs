//! Task bodies.
//!
//! Each body decodes its arguments, checks the region and future counts,
//! cuts views out of the bound regions and hands them to a kernel. Bodies
//! are generic over the element type and the reduction operator; [`run`]
//! picks the operator from the task descriptor.

use smallvec::SmallVec;
use ufunc_kernel::{
    combine_broadcast_inplace, combine_broadcast_into, combine_inplace, combine_into,
    combine_scalars, fold_scalars, radix_fan_in, reduce_all, reduce_axis_into, ExecPolicy,
    MAX_REDUCTION_RADIX,
};
use ufunc_traits::{Max, Min, Prod, ReduceScalar, ReductionKind, ReductionOp, Sum};
use ufunc_view::{OperandView, Privilege};

use crate::args::{CollapseArgs, RadixArgs, ShapeArgs};
use crate::context::{FutureValue, TaskContext, TaskOutput};
use crate::error::{Result, TaskError};
use crate::opcode::TaskKind;
use crate::registry::TaskDescriptor;

/// Run the body of `desc` on `ctx`.
#[tracing::instrument(level = "debug", skip_all, fields(task = %desc.name, id = desc.id.0))]
pub(crate) fn run<T: ReduceScalar>(
    desc: &TaskDescriptor,
    ctx: TaskContext<'_, T>,
    policy: &ExecPolicy,
) -> Result<TaskOutput<T>> {
    match desc.reduction {
        ReductionKind::Max => run_with(&Max, desc.kind, ctx, policy),
        ReductionKind::Min => run_with(&Min, desc.kind, ctx, policy),
        ReductionKind::Sum => run_with(&Sum, desc.kind, ctx, policy),
        ReductionKind::Prod => run_with(&Prod, desc.kind, ctx, policy),
    }
}

fn run_with<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    kind: TaskKind,
    ctx: TaskContext<'_, T>,
    policy: &ExecPolicy,
) -> Result<TaskOutput<T>> {
    match kind {
        TaskKind::AxisCollapse => axis_collapse(op, ctx, policy).map(|()| TaskOutput::Done),
        TaskKind::WholePartition => whole_partition(op, ctx, policy).map(TaskOutput::Scalar),
        TaskKind::ReductionScalar => {
            let (a, b) = scalar_pair(&ctx)?;
            Ok(TaskOutput::Scalar(fold_scalars(op, a, b)))
        }
        TaskKind::Combine => combine(op, ctx, policy).map(|()| TaskOutput::Done),
        TaskKind::CombineBroadcast => combine_broadcast(op, ctx, policy).map(|()| TaskOutput::Done),
        TaskKind::CombineScalar => {
            let (a, b) = scalar_pair(&ctx)?;
            Ok(TaskOutput::Scalar(combine_scalars(op, a, b)))
        }
        TaskKind::RadixFanIn => radix(op, ctx, policy).map(|()| TaskOutput::Done),
    }
}

fn expect_futures<T>(futures: &[FutureValue<T>], allowed: &[usize], expected: &'static str) -> Result<()> {
    if allowed.contains(&futures.len()) {
        Ok(())
    } else {
        Err(TaskError::FutureCount {
            expected,
            actual: futures.len(),
        })
    }
}

fn region_count(expected: &'static str, actual: usize) -> TaskError {
    TaskError::RegionCount { expected, actual }
}

/// Seed the output with the future (or identity), then fold one input axis
/// into it.
fn axis_collapse<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    mut ctx: TaskContext<'_, T>,
    policy: &ExecPolicy,
) -> Result<()> {
    let args = CollapseArgs::decode(ctx.args)?;
    expect_futures(ctx.futures, &[0, 1], "0 or 1")?;
    let num_regions = ctx.regions.len();
    if num_regions != 2 {
        return Err(region_count("2", num_regions));
    }
    if args.init_rect.is_empty() {
        tracing::debug!(rank = args.init_rect.dim(), "empty output rectangle");
        return Ok(());
    }
    let slice = match args.collapse_dim {
        Some(axis) => Some((axis, ctx.index_coord(axis)?)),
        None => None,
    };
    let seed = ctx.futures.first().map(FutureValue::get_result);

    let [out, input] = ctx.regions.as_mut_slice() else {
        return Err(region_count("2", num_regions));
    };
    let mut dest = out.output(0, &args.init_rect, slice, Privilege::ReadWrite)?;
    let src = input.input(1, &args.in_rect, None)?;
    tracing::debug!(rank = args.in_rect.dim(), axis = args.axis, seeded = seed.is_some(), "axis collapse");
    reduce_axis_into(op, &mut dest, &src, args.axis, seed, policy)?;
    Ok(())
}

fn whole_partition<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    ctx: TaskContext<'_, T>,
    policy: &ExecPolicy,
) -> Result<T> {
    let args = ShapeArgs::decode(ctx.args)?;
    expect_futures(ctx.futures, &[0], "0")?;
    let [input] = ctx.regions.as_slice() else {
        return Err(region_count("1", ctx.regions.len()));
    };
    let src = input.input(0, &args.rect, None)?;
    tracing::debug!(rank = args.rect.dim(), points = args.rect.volume(), "whole partition");
    Ok(reduce_all(op, &src, policy)?)
}

fn scalar_pair<T: ReduceScalar>(ctx: &TaskContext<'_, T>) -> Result<(T, T)> {
    if !ctx.regions.is_empty() {
        return Err(region_count("0", ctx.regions.len()));
    }
    match ctx.futures {
        [a, b] => Ok((a.get_result(), b.get_result())),
        futures => Err(TaskError::FutureCount {
            expected: "2",
            actual: futures.len(),
        }),
    }
}

/// Two regions fold in place into region 0; three write a fresh region 0.
fn combine<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    mut ctx: TaskContext<'_, T>,
    policy: &ExecPolicy,
) -> Result<()> {
    let args = ShapeArgs::decode(ctx.args)?;
    expect_futures(ctx.futures, &[0], "0")?;
    let rect = &args.rect;
    match ctx.regions.as_mut_slice() {
        [out, rhs] => {
            if rect.is_empty() {
                tracing::debug!(rank = rect.dim(), "empty rectangle");
                return Ok(());
            }
            let mut dest = out.output(0, rect, None, Privilege::ReadWrite)?;
            let rhs = rhs.input(1, rect, None)?;
            combine_inplace(op, &mut dest, &rhs, policy)?;
        }
        [out, lhs, rhs] => {
            if rect.is_empty() {
                tracing::debug!(rank = rect.dim(), "empty rectangle");
                return Ok(());
            }
            let mut dest = out.output(0, rect, None, Privilege::WriteDiscard)?;
            let lhs = lhs.input(1, rect, None)?;
            let rhs = rhs.input(2, rect, None)?;
            combine_into(op, &mut dest, &lhs, &rhs, policy)?;
        }
        regions => return Err(region_count("2 or 3", regions.len())),
    }
    Ok(())
}

/// Combine with the single future; in place with one region, fresh output
/// with two.
fn combine_broadcast<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    mut ctx: TaskContext<'_, T>,
    policy: &ExecPolicy,
) -> Result<()> {
    let args = ShapeArgs::decode(ctx.args)?;
    let [future] = ctx.futures else {
        return Err(TaskError::FutureCount {
            expected: "1",
            actual: ctx.futures.len(),
        });
    };
    let rect = &args.rect;
    match ctx.regions.as_mut_slice() {
        [out] => {
            if rect.is_empty() {
                tracing::debug!(rank = rect.dim(), "empty rectangle");
                return Ok(());
            }
            let mut dest = out.output(0, rect, None, Privilege::ReadWrite)?;
            combine_broadcast_inplace(op, &mut dest, future.get_result(), policy)?;
        }
        [out, lhs] => {
            if rect.is_empty() {
                tracing::debug!(rank = rect.dim(), "empty rectangle");
                return Ok(());
            }
            let mut dest = out.output(0, rect, None, Privilege::WriteDiscard)?;
            let lhs = lhs.input(1, rect, None)?;
            combine_broadcast_into(op, &mut dest, &lhs, future.get_result(), policy)?;
        }
        regions => return Err(region_count("1 or 2", regions.len())),
    }
    Ok(())
}

/// Fold the present candidate regions into region 0.
fn radix<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    mut ctx: TaskContext<'_, T>,
    policy: &ExecPolicy,
) -> Result<()> {
    let args = RadixArgs::decode(ctx.args)?;
    expect_futures(ctx.futures, &[0], "0")?;
    let num_regions = ctx.regions.len();
    if num_regions == 0 {
        return Err(region_count("at least 1", 0));
    }
    let slots = num_regions - 1;
    let radix = usize::try_from(args.radix).unwrap_or(0);
    if radix == 0 || radix > MAX_REDUCTION_RADIX || slots > radix {
        return Err(TaskError::MalformedRadix {
            radix: args.radix,
            slots,
        });
    }
    if args.rect.is_empty() {
        tracing::debug!(rank = args.rect.dim(), "empty rectangle");
        return Ok(());
    }

    let offset = match args.extra_dim_in {
        Some(axis) => ctx.index_coord(axis)? * radix as i64,
        None => 0,
    };
    let out_slice = match args.extra_dim_out {
        Some(axis) => Some((axis, ctx.index_coord(axis)?)),
        None => None,
    };

    let [out, candidates @ ..] = ctx.regions.as_mut_slice() else {
        return Err(region_count("at least 1", num_regions));
    };
    let mut inputs: SmallVec<[OperandView<'_, T>; MAX_REDUCTION_RADIX]> = SmallVec::new();
    for (k, region) in candidates.iter().enumerate() {
        if region.is_absent() {
            continue;
        }
        let idx = k + 1;
        let slice = args.extra_dim_in.map(|axis| (axis, offset + idx as i64 - 1));
        inputs.push(region.input(idx, &args.rect, slice)?);
    }
    let mut dest = out.output(0, &args.rect, out_slice, Privilege::WriteDiscard)?;
    tracing::debug!(rank = args.rect.dim(), radix, present = inputs.len(), "radix fan-in");
    radix_fan_in(op, &mut dest, &inputs, policy)?;
    Ok(())
}
