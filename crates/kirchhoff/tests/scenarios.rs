use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use kirchhoff::devices::{Capacitor, CurrentSource, FabsBattery, Ground, Resistance, VoltageSource};
use kirchhoff::{ElectricalLink, Node, Simulation, Symbol};

fn node(n: impl Node + 'static) -> Rc<RefCell<dyn Node>> {
    Rc::new(RefCell::new(n))
}

/// Every variable's symbols at every lag it has history for, evaluated at step `t`. Feeding this
/// back into a node's or link's own `relations` re-checks the simulation's output against its own
/// constitutive equations, independent of whatever the solver did to produce it.
fn committed_values(sim: &Simulation, t: usize) -> HashMap<Symbol, f64> {
    let mut values = HashMap::new();
    for node in sim.nodes() {
        let node_ref = node.borrow();
        for var in node_ref.variables() {
            for (lag, sym) in var.symbols().iter().enumerate() {
                if t >= lag {
                    values.insert(sym.clone(), var.values()[t - lag]);
                }
            }
        }
    }
    values
}

/// Re-evaluates every node's and every link's relations at step `t` against the simulation's own
/// committed history and asserts each one is satisfied (the Kirchhoff current-sum and
/// voltage-equality relations come from the links; the constitutive relations come from the
/// nodes).
fn assert_step_is_self_consistent(sim: &Simulation, t: usize, tol: f64) {
    let values = committed_values(sim, t);
    for node in sim.nodes() {
        let node_ref = node.borrow();
        for rel in node_ref.relations(t).unwrap() {
            let residual = rel.eval(&values);
            assert!(residual.abs() < tol, "node relation at t={t} residual {residual}");
        }
    }
    for link in sim.links() {
        for rel in link.relations() {
            let residual = rel.eval(&values);
            assert!(residual.abs() < tol, "link relation at t={t} residual {residual}");
        }
    }
}

/// No two variables across the whole simulation ever mint the same symbol.
fn assert_all_symbols_unique(sim: &Simulation) {
    let mut all = Vec::new();
    for node in sim.nodes() {
        let node_ref = node.borrow();
        for var in node_ref.variables() {
            all.extend(var.symbols().iter().cloned());
        }
    }
    let unique: HashSet<_> = all.iter().cloned().collect();
    assert_eq!(all.len(), unique.len(), "duplicate symbol across nodes");
}

fn q_values(cap_ref: &dyn Node) -> Vec<f64> {
    cap_ref
        .variables()
        .iter()
        .find(|v| v.name().ends_with(".q"))
        .unwrap()
        .values()
        .to_vec()
}

/// S1: a current source charges a capacitor against ground.
#[test]
fn s1_current_source_charges_a_capacitor() {
    let source = CurrentSource::new("i1", 1.0);
    let cap = Capacitor::new("c1", 1e-3, 1.0);
    let gnd = Ground::new("gnd");

    // CurrentSource pins i0 = I (current flowing in at port 0), so i1 = -I: port 1 is the
    // terminal that pushes I amps out into whatever it's tied to. Wire that one to the
    // capacitor's charging terminal so the source actually charges the capacitor rather than
    // draining it.
    let top = ElectricalLink::new(vec![source.port(1).id(), cap.port(0).id()]);
    let bottom = ElectricalLink::new(vec![source.port(0).id(), cap.port(1).id(), gnd.port().id()]);

    let source = node(source);
    let cap = node(cap);
    let gnd = node(gnd);

    let mut sim = Simulation::new();
    sim.add_nodes([source, cap.clone(), gnd]);
    sim.add_links([top, bottom]);
    sim.simulate(0.1, 1.0).unwrap();

    let q = q_values(&*cap.borrow());
    assert_eq!(q.len(), 10);
    // The charge update is decoupled from voltage (it's pinned directly by the forced current),
    // so this recurrence is exact, not approximate.
    for (t, &qt) in q.iter().enumerate() {
        let expected = 1.0 + 0.1 * t as f64;
        assert!((qt - expected).abs() < 1e-6, "q[{t}] = {qt}, expected {expected}");
    }

    assert_all_symbols_unique(&sim);
    for t in 1..10 {
        assert_step_is_self_consistent(&sim, t, 1e-6);
    }
}

/// S2: an initially-charged capacitor discharges through a resistor into ground.
#[test]
fn s2_rc_discharge_decays_toward_zero() {
    let cap = Capacitor::new("c1", 1.0, 5.0);
    let r = Resistance::new("r1", 2.0);
    let gnd = Ground::new("gnd");

    let top = ElectricalLink::new(vec![cap.port(0).id(), r.port(0).id()]);
    let bottom = ElectricalLink::new(vec![cap.port(1).id(), r.port(1).id(), gnd.port().id()]);

    let cap = node(cap);
    let r = node(r);
    let gnd = node(gnd);

    let mut sim = Simulation::new();
    sim.add_nodes([cap.clone(), r, gnd]);
    sim.add_links([top, bottom]);
    sim.simulate(0.01, 0.5).unwrap();

    let q = q_values(&*cap.borrow());
    assert!(q[0].abs() > q[q.len() - 1].abs());

    assert_all_symbols_unique(&sim);
    for t in 1..q.len() {
        assert_step_is_self_consistent(&sim, t, 1e-6);
    }
}

/// S3: a capacitor discharges through two unequal resistors wired in PARALLEL to ground, so the
/// effective decay constant is set by `R1*R2/(R1+R2)`, not by either resistor alone.
#[test]
fn s3_parallel_resistor_discharge() {
    let c = 1.0;
    let r1_ohms = 100.0;
    let r2_ohms = 50.0;
    let q_init = 5.0;
    let dt = 0.01;

    let cap = Capacitor::new("c1", c, q_init);
    let r1 = Resistance::new("r1", r1_ohms);
    let r2 = Resistance::new("r2", r2_ohms);
    let gnd = Ground::new("gnd");

    // Both resistors span the same two nodes as the capacitor: a genuine parallel connection,
    // not the series chain a middle link would produce.
    let top = ElectricalLink::new(vec![cap.port(0).id(), r1.port(0).id(), r2.port(0).id()]);
    let bottom = ElectricalLink::new(vec![
        cap.port(1).id(),
        r1.port(1).id(),
        r2.port(1).id(),
        gnd.port().id(),
    ]);

    let cap = node(cap);
    let mut sim = Simulation::new();
    sim.add_nodes([cap.clone(), node(r1), node(r2), node(gnd)]);
    sim.add_links([top, bottom]);
    sim.simulate(dt, 0.3).unwrap();

    let q = q_values(&*cap.borrow());

    let r_eq = r1_ohms * r2_ohms / (r1_ohms + r2_ohms);
    let decay = 1.0 / (1.0 + dt / (c * r_eq));
    for t in 1..q.len() {
        let expected = q[t - 1] * decay;
        assert!((q[t] - expected).abs() < 1e-9, "q[{t}] = {}, expected {expected}", q[t]);
    }
    // Sanity check against the naive (wrong) single-resistor time constants: the parallel
    // combination discharges faster than either resistor would alone.
    assert!(r_eq < r1_ohms.min(r2_ohms));

    assert_all_symbols_unique(&sim);
    for t in 1..q.len() {
        assert_step_is_self_consistent(&sim, t, 1e-6);
    }
}

/// S4: an ideal voltage source drives a resistor; the resistor current settles at V/R from the
/// very first step, since there's no capacitor here to impose a transient.
#[test]
fn s4_voltage_source_steady_state() {
    let voltage = 1.0;
    let resistance = 1e3;
    let vs = VoltageSource::new("v1", voltage);
    let r = Resistance::new("r1", resistance);
    let gnd = Ground::new("gnd");

    // Ground is a single shared reference node: everything tied to it belongs in one link, not
    // one link per connection, or its current would be double-counted across separate KCL sums.
    let ground_link = ElectricalLink::new(vec![vs.port(0).id(), r.port(1).id(), gnd.port().id()]);
    let signal = ElectricalLink::new(vec![vs.port(1).id(), r.port(0).id()]);

    let r = node(r);
    let mut sim = Simulation::new();
    sim.add_nodes([node(vs), r.clone(), node(gnd)]);
    sim.add_links([ground_link, signal]);
    sim.simulate(0.1, 0.3).unwrap();

    let r_ref = r.borrow();
    let i1 = r_ref
        .variables()
        .iter()
        .find(|v| v.name().ends_with("r1.p1.i"))
        .unwrap()
        .values()
        .to_vec();
    let expected = voltage / resistance;
    for (t, &it) in i1.iter().enumerate() {
        assert!((it.abs() - expected).abs() < 1e-6, "i1[{t}] = {it}, expected magnitude {expected}");
    }
    drop(r_ref);

    assert_all_symbols_unique(&sim);
    for t in 0..3 {
        assert_step_is_self_consistent(&sim, t, 1e-6);
    }
}

/// S5: mixing a derivative-order-1 capacitor with a derivative-order-0 resistor negotiates the
/// simulation-wide derivative order up to 1.
#[test]
fn s5_derivative_order_negotiation() {
    let cap = Capacitor::new("c1", 1.0, 1.0);
    let r = Resistance::new("r1", 1.0);
    let gnd = Ground::new("gnd");

    let top = ElectricalLink::new(vec![cap.port(0).id(), r.port(0).id()]);
    let bottom = ElectricalLink::new(vec![cap.port(1).id(), r.port(1).id(), gnd.port().id()]);

    let mut sim = Simulation::new();
    sim.add_nodes([node(cap), node(r), node(gnd)]);
    assert_eq!(sim.derivative_order(), 1);
    sim.add_links([top, bottom]);
    sim.simulate(0.1, 0.3).unwrap();

    assert_all_symbols_unique(&sim);
    for t in 1..3 {
        assert_step_is_self_consistent(&sim, t, 1e-6);
    }
}

/// S6: a Peukert/Shepherd battery discharges into a resistive load, wired exactly as the
/// reference battery-plus-resistor network: both of the resistor's ports and the battery's
/// ports span the same two nodes, with ground tapped on the battery's port-0 side.
#[test]
fn s6_fabs_battery_discharge_into_load() {
    let t_ref = 20.0;
    let q_nom_t_ref = 1100.0;
    let k = 1.2;
    let ri_oc = 0.34;
    let voc100_ref = 2.15;
    let bat_series = 24.0;
    let bat_parallel = 1.0;
    let soc_init = 1.0;
    let dt = 1e-4;
    let total_time = 20.0;
    let resistance = 1e3;

    let battery = FabsBattery::new(
        "b1",
        t_ref,
        q_nom_t_ref,
        k,
        ri_oc,
        voc100_ref,
        bat_series,
        bat_parallel,
        soc_init,
    );
    let r = Resistance::new("r1", resistance);
    let gnd = Ground::new("gnd");

    let top = ElectricalLink::new(vec![battery.port(0).id(), r.port(0).id(), gnd.port().id()]);
    let bottom = ElectricalLink::new(vec![battery.port(1).id(), r.port(1).id()]);

    let battery = node(battery);
    let mut sim = Simulation::new();
    sim.add_nodes([battery.clone(), node(r), node(gnd)]);
    sim.add_links([top, bottom]);
    sim.simulate(dt, total_time).unwrap();

    let battery_ref = battery.borrow();
    let soc = battery_ref
        .variables()
        .iter()
        .find(|v| v.name().ends_with(".soc"))
        .unwrap()
        .values()
        .to_vec();
    // The discharge current is tiny next to the battery's capacity (milliamps against a
    // ~1100 mAh-class rating), so over this run soc barely moves off its initial value.
    for &s in &soc {
        assert!((s - soc_init).abs() < 1e-3, "soc drifted to {s}");
    }

    // Port 1 is the terminal the load is wired to (port 0 sits on the grounded side); that's the
    // one that carries the battery's discharge current out into the resistor, and it stays
    // positive for the whole run. Index 0 is never solved (the battery needs derivative_order 1,
    // so stepping starts at t=1) and sits at its zero seed, so the check starts at index 1.
    let port1_current = battery_ref
        .variables()
        .iter()
        .find(|v| v.name().ends_with("b1.p1.i"))
        .unwrap()
        .values()
        .to_vec();
    for &i in &port1_current[1..] {
        assert!(i > 0.0, "discharge current went non-positive: {i}");
    }

    let port0_v = battery_ref
        .variables()
        .iter()
        .find(|v| v.name().ends_with("b1.p0.v"))
        .unwrap()
        .values()
        .to_vec();
    let port1_v = battery_ref
        .variables()
        .iter()
        .find(|v| v.name().ends_with("b1.p1.v"))
        .unwrap()
        .values()
        .to_vec();
    let open_circuit = voc100_ref * bat_series;
    for t in 1..port0_v.len() {
        let terminal_voltage = (port1_v[t] - port0_v[t]).abs();
        // The internal-resistance drop (ri_oc * bat_series against a 1kOhm load) is a small
        // fraction of the open-circuit voltage, so the terminal voltage stays close to it.
        assert!(
            (terminal_voltage - open_circuit).abs() / open_circuit < 0.15,
            "terminal voltage {terminal_voltage} too far from open-circuit {open_circuit}"
        );
    }
    drop(battery_ref);

    assert_all_symbols_unique(&sim);
    // A full per-step residual re-check over 200,000 steps adds nothing the solver's own
    // convergence check didn't already verify; sample the start, middle and end instead.
    for &t in &[1usize, 100_000, 199_999] {
        assert_step_is_self_consistent(&sim, t, 1e-6);
    }
}
