use grid_core::{ControlTarget, ConverterControlType, HvdcControlMode, Network};

use super::ExtractionContext;
use crate::bus_control::{set_bus_control_voltage, ControlPriority, ControlRequest};
use crate::data::{HvdcData, VscData};
use crate::error::{CompileError, CompileResult};

/// HVDC links. An external dispatch forces the fixed-power mode.
pub fn extract_hvdc(network: &Network, ctx: &mut ExtractionContext) -> CompileResult<HvdcData> {
    let links = network.hvdc_links();
    let mut data = HvdcData::new(links.len());
    let t = ctx.t_idx;

    for (k, link) in links.into_iter().enumerate() {
        let f = ctx.bus_map.resolve(link.from_bus, "HVDC", &link.name)?;
        let to = ctx.bus_map.resolve(link.to_bus, "HVDC", &link.name)?;
        let rate = link.rate.at(t);
        let active = link.active.at(t);

        data.names[k] = link.name.clone();
        data.idtags[k] = link.idtag.clone();
        data.active[k] = active;
        data.dispatchable[k] = link.dispatchable;
        data.f[k] = f;
        data.t[k] = to;
        data.rates[k] = rate;
        data.contingency_rates[k] = rate * link.contingency_factor.at(t);
        data.protection_rates[k] = rate * link.protection_factor.at(t);
        data.vset_f[k] = link.vset_f.at(t);
        data.vset_t[k] = link.vset_t.at(t);
        data.vnf[k] = ctx.bus_data.vnom[f];
        data.vnt[k] = ctx.bus_data.vnom[to];
        data.angle_droop[k] = link.angle_droop.at(t);
        data.r[k] = link.r;
        data.qmin_f[k] = link.qmin_f;
        data.qmax_f[k] = link.qmax_f;
        data.qmin_t[k] = link.qmin_t;
        data.qmax_t[k] = link.qmax_t;

        match ctx.dispatch.and_then(|d| d.hvdc_p(k)) {
            Some(p) => {
                data.control_mode[k] = HvdcControlMode::Pset;
                data.pset[k] = p;
            }
            None => {
                data.control_mode[k] = link.control_mode;
                data.pset[k] = link.pset.at(t);
            }
        }

        if active {
            for (bus, vset) in [(f, data.vset_f[k]), (to, data.vset_t[k])] {
                let request = ControlRequest::local(bus, vset, ControlPriority::Hvdc);
                set_bus_control_voltage(
                    &mut ctx.bus_data,
                    &mut ctx.controls,
                    &request,
                    ctx.options.use_stored_guess,
                    &mut ctx.diagnostics,
                );
            }
        }
    }

    Ok(data)
}

/// Bus and branch indices regulated by one converter control loop.
///
/// Without an explicit target, AC quantities act on the AC terminal and DC
/// quantities on the DC terminal.
fn resolve_target(
    ctx: &ExtractionContext,
    target: Option<ControlTarget>,
    control: ConverterControlType,
    dc_bus: usize,
    ac_bus: usize,
    name: &str,
) -> CompileResult<(Option<usize>, Option<usize>)> {
    match target {
        Some(ControlTarget::Bus(id)) => Ok((Some(ctx.bus_map.resolve(id, "VSC", name)?), None)),
        Some(ControlTarget::Branch(id)) => {
            let row = ctx
                .branch_index
                .get(&id)
                .copied()
                .ok_or_else(|| CompileError::MissingBranch {
                    device: "VSC",
                    name: name.to_string(),
                    branch: id.value(),
                })?;
            Ok((None, Some(row)))
        }
        None => match control {
            ConverterControlType::VmDc | ConverterControlType::Pdc => Ok((Some(dc_bus), None)),
            _ => Ok((Some(ac_bus), None)),
        },
    }
}

/// Voltage source converters. Must run after [`super::extract_branches`].
pub fn extract_vsc(network: &Network, ctx: &mut ExtractionContext) -> CompileResult<VscData> {
    let converters = network.converters();
    let mut data = VscData::new(converters.len());
    let t = ctx.t_idx;

    for (k, vsc) in converters.into_iter().enumerate() {
        let f = ctx.bus_map.resolve(vsc.from_bus, "VSC", &vsc.name)?;
        let to = ctx.bus_map.resolve(vsc.to_bus, "VSC", &vsc.name)?;
        let rate = vsc.rate.at(t);
        let active = vsc.active.at(t);

        data.names[k] = vsc.name.clone();
        data.idtags[k] = vsc.idtag.clone();
        data.active[k] = active;
        data.f[k] = f;
        data.t[k] = to;
        data.rates[k] = rate;
        data.contingency_rates[k] = rate * vsc.contingency_factor.at(t);
        data.protection_rates[k] = rate * vsc.protection_factor.at(t);
        data.control1[k] = vsc.control1;
        data.control2[k] = vsc.control2;
        data.control1_val[k] = vsc.control1_val.at(t);
        data.control2_val[k] = vsc.control2_val.at(t);
        data.alpha1[k] = vsc.alpha1;
        data.alpha2[k] = vsc.alpha2;
        data.alpha3[k] = vsc.alpha3;
        data.kdp[k] = vsc.kdp;

        let (bus1, branch1) =
            resolve_target(ctx, vsc.control1_target, vsc.control1, f, to, &vsc.name)?;
        let (bus2, branch2) =
            resolve_target(ctx, vsc.control2_target, vsc.control2, f, to, &vsc.name)?;
        data.control1_bus[k] = bus1;
        data.control1_branch[k] = branch1;
        data.control2_bus[k] = bus2;
        data.control2_branch[k] = branch2;

        if !active {
            continue;
        }
        let loops = [
            (vsc.control1, bus1, data.control1_val[k]),
            (vsc.control2, bus2, data.control2_val[k]),
        ];
        for (control, bus, value) in loops {
            if let (ConverterControlType::VmAc, Some(bus)) = (control, bus) {
                let request = ControlRequest::local(bus, value, ControlPriority::Vsc);
                set_bus_control_voltage(
                    &mut ctx.bus_data,
                    &mut ctx.controls,
                    &request,
                    ctx.options.use_stored_guess,
                    &mut ctx.diagnostics,
                );
            }
        }
    }

    Ok(data)
}
