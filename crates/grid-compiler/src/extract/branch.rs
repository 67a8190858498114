use grid_core::{
    category, BranchCommon, Kilovolts, Network, SeriesImpedance, TapModuleControl,
};
use tracing::warn;

use super::ExtractionContext;
use crate::bus_control::{seed_voltage, ControlPriority};
use crate::data::{BranchData, BranchKind};
use crate::error::CompileResult;

/// Fill the fields every branch kind shares and return its terminals.
fn fill_common(
    data: &mut BranchData,
    k: usize,
    kind: BranchKind,
    common: &BranchCommon,
    device: &'static str,
    ctx: &mut ExtractionContext,
) -> CompileResult<(usize, usize)> {
    let t = ctx.t_idx;
    let f = ctx.bus_map.resolve(common.from_bus, device, &common.name)?;
    let to = ctx.bus_map.resolve(common.to_bus, device, &common.name)?;
    let rate = common.rate.at(t);

    data.names[k] = common.name.clone();
    data.idtags[k] = common.idtag.clone();
    data.kinds[k] = kind;
    data.active[k] = common.active.at(t);
    data.f[k] = f;
    data.t[k] = to;
    data.rates[k] = rate;
    data.contingency_rates[k] = rate * common.contingency_factor.at(t);
    data.protection_rates[k] = rate * common.protection_factor.at(t);
    data.overload_cost[k] = common.overload_cost.at(t);
    data.monitor_loading[k] = common.monitor_loading;
    data.contingency_enabled[k] = common.contingency_enabled;
    data.reducible[k] = common.reducible;
    data.mttf[k] = common.mttf;
    data.mttr[k] = common.mttr;

    ctx.branch_index.insert(common.id, k);
    Ok((f, to))
}

fn fill_impedance(data: &mut BranchData, k: usize, z: &SeriesImpedance, r: f64) {
    data.r[k] = r;
    data.x[k] = z.x;
    data.g[k] = z.g;
    data.b[k] = z.b;
    data.r0[k] = z.r0;
    data.x0[k] = z.x0;
    data.g0[k] = z.g0;
    data.b0[k] = z.b0;
    data.r2[k] = z.r2;
    data.x2[k] = z.x2;
    data.g2[k] = z.g2;
    data.b2[k] = z.b2;
}

/// Lines, DC lines, transformers, UPFCs and series reactances, in that order.
///
/// Records the row of every branch id in the context so that converters can
/// reference branches afterwards.
pub fn extract_branches(network: &Network, ctx: &mut ExtractionContext) -> CompileResult<BranchData> {
    let lines = network.lines();
    let dc_lines = network.dc_lines();
    let transformers = network.transformers();
    let upfcs = network.upfcs();
    let reactances = network.series_reactances();
    let n = lines.len() + dc_lines.len() + transformers.len() + upfcs.len() + reactances.len();

    let mut data = BranchData::new(n);
    let t = ctx.t_idx;
    let mode = ctx.options.branch_tolerance_mode;
    let mut k = 0;

    for line in lines {
        fill_common(&mut data, k, BranchKind::Line, &line.common, "Line", ctx)?;
        let r = if ctx.options.apply_temperature {
            line.r_corrected()
        } else {
            line.impedance.r
        };
        fill_impedance(&mut data, k, &line.impedance, r * mode.r_factor(line.tolerance));
        k += 1;
    }

    for line in dc_lines {
        fill_common(&mut data, k, BranchKind::DcLine, &line.common, "DC line", ctx)?;
        let r = if ctx.options.apply_temperature {
            line.r_corrected()
        } else {
            line.r
        };
        data.r[k] = r * mode.r_factor(line.tolerance);
        data.is_dc[k] = true;
        k += 1;
    }

    for (ii, tr) in transformers.into_iter().enumerate() {
        let (f, to) =
            fill_common(&mut data, k, BranchKind::Transformer, &tr.common, "Transformer", ctx)?;
        fill_impedance(
            &mut data,
            k,
            &tr.impedance,
            tr.impedance.r * mode.r_factor(tr.tolerance),
        );

        data.conn[k] = tr.conn;
        data.tap_module[k] = tr.tap_module.at(t);
        data.tap_module_min[k] = tr.tap_module_min;
        data.tap_module_max[k] = tr.tap_module_max;
        data.tap_angle[k] = ctx
            .dispatch
            .and_then(|d| d.tap_angle_at(ii))
            .unwrap_or_else(|| tr.tap_phase.at(t));
        data.tap_angle_min[k] = tr.tap_phase_min;
        data.tap_angle_max[k] = tr.tap_phase_max;
        data.tap_module_control[k] = tr.tap_module_control;
        data.tap_phase_control[k] = tr.tap_phase_control;
        data.vset[k] = tr.vset.at(t);
        data.pset[k] = tr.pset.at(t) / ctx.sbase;
        data.qset[k] = tr.qset.at(t) / ctx.sbase;

        let (vtap_f, vtap_t) = tr.virtual_taps(
            Kilovolts(ctx.bus_data.vnom[f]),
            Kilovolts(ctx.bus_data.vnom[to]),
        );
        data.virtual_tap_f[k] = vtap_f;
        data.virtual_tap_t[k] = vtap_t;

        let regulated = match ctx
            .bus_map
            .resolve_opt(tr.regulation_bus, "Transformer", &tr.common.name)?
        {
            Some(bus) => bus,
            None => {
                if tr.tap_module_control == TapModuleControl::Vm {
                    ctx.diagnostics.add_warning_with_entity(
                        category::CONTROL,
                        "Unspecified regulation bus",
                        &tr.common.name,
                    );
                    warn!(branch = %tr.common.name, "unspecified regulation bus, using the from bus");
                }
                f
            }
        };
        data.ctrl_bus[k] = Some(regulated);

        if tr.tap_module_control == TapModuleControl::Vm
            && data.active[k]
            && !ctx.options.use_stored_guess
        {
            let vset = data.vset[k];
            if vset <= 0.0 {
                if !ctx.controls.is_written(regulated) {
                    ctx.diagnostics.add_warning_with_value(
                        category::CONTROL,
                        "Branch control voltage out of bounds",
                        &tr.common.name,
                        vset,
                    );
                }
            } else {
                seed_voltage(
                    &mut ctx.bus_data,
                    &mut ctx.controls,
                    regulated,
                    vset,
                    ControlPriority::Branch,
                    &mut ctx.diagnostics,
                );
            }
        }
        k += 1;
    }

    for upfc in upfcs {
        fill_common(&mut data, k, BranchKind::Upfc, &upfc.common, "UPFC", ctx)?;
        data.r[k] = upfc.rs;
        data.x[k] = upfc.xs;
        data.r0[k] = upfc.rs0;
        data.x0[k] = upfc.xs0;
        data.r2[k] = upfc.rs2;
        data.x2[k] = upfc.xs2;
        data.b[k] = upfc.shunt_susceptance();
        data.pset[k] = upfc.pfset.at(t) / ctx.sbase;
        data.qset[k] = upfc.qfset.at(t) / ctx.sbase;
        data.vset[k] = upfc.vsh.at(t);
        k += 1;
    }

    for reactance in reactances {
        fill_common(
            &mut data,
            k,
            BranchKind::SeriesReactance,
            &reactance.common,
            "Series reactance",
            ctx,
        )?;
        fill_impedance(
            &mut data,
            k,
            &reactance.impedance,
            reactance.impedance.r * mode.r_factor(reactance.tolerance),
        );
        k += 1;
    }

    Ok(data)
}
