//! Multi-member validation of the collective command dispatch.
//!
//! Every test launches a real thread group, drives it from the head and
//! checks the state that every member ends up with:
//! - local boxes tile the global box with matching faces
//! - rejected commands leave every member unchanged
//! - no member runs ahead of a geometry change
//! - worker-side setters are no-ops
//! - a head failing mid-command does not strand the workers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use orchestrator::{
    ChangeEvent, Error, GeometryObserver, MemberReport, SimulationContext, StandAlone,
    SystemConfig, ThreadGroup, Transport,
};

/// Counts geometry events delivered to any member of the group.
struct GeometryCounter {
    count: Arc<AtomicUsize>,
}

impl GeometryObserver for GeometryCounter {
    fn on_change(&mut self, event: ChangeEvent, _context: &SimulationContext) {
        if event == ChangeEvent::GeometryChanged {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Fails the member it is registered on at the first geometry change.
struct FailingObserver;

impl GeometryObserver for FailingObserver {
    fn on_change(&mut self, event: ChangeEvent, _context: &SimulationContext) {
        if event == ChangeEvent::GeometryChanged {
            panic!("observer failed");
        }
    }
}

fn launch_reports<F>(size: usize, head_script: F) -> Vec<MemberReport>
where
    F: Fn(&mut StandAlone<orchestrator::GroupMember>) + Send + Sync + 'static,
{
    ThreadGroup::launch(size, move |member| {
        let mut system = StandAlone::start(member).unwrap();
        if system.is_head() {
            head_script(&mut system);
            system.shutdown().unwrap();
        }
        MemberReport::from_context(system.context())
    })
    .unwrap()
}

#[test]
fn eight_members_tile_the_box() {
    let config = SystemConfig {
        num_processes: 8,
        box_length: [4.0, 6.0, 8.0],
        node_grid: Some([2, 2, 2]),
        ..SystemConfig::default()
    };
    let reports = orchestrator::run_configured(&config).unwrap();
    assert_eq!(reports.len(), 8);
    assert_eq!(orchestrator::total_local_volume(&reports), 4.0 * 6.0 * 8.0);

    for report in &reports {
        assert_eq!(report.local_box.local_length(), [2.0, 3.0, 4.0]);
        for axis in 0..3 {
            assert_eq!(
                report.local_box.origin()[axis],
                report.coordinate[axis] as f64 * report.local_box.local_length()[axis]
            );
            if report.coordinate[axis] == 0 {
                let upper = &reports[report.neighbor_ranks[2 * axis + 1]];
                assert_eq!(
                    report.local_box.upper_corner()[axis],
                    upper.local_box.origin()[axis]
                );
                assert_eq!(report.local_box.boundary(2 * axis), Some(1));
                assert_eq!(report.local_box.boundary(2 * axis + 1), Some(0));
            } else {
                assert_eq!(report.local_box.boundary(2 * axis), Some(0));
                assert_eq!(report.local_box.boundary(2 * axis + 1), Some(-1));
            }
        }
    }
}

#[test]
fn two_members_scenario() {
    let reports = launch_reports(2, |system| {
        system.set_box_length([10.0, 10.0, 10.0]).unwrap();
        system.set_node_grid([2, 1, 1]).unwrap();
    });

    assert_eq!(reports[0].coordinate, [0, 0, 0]);
    assert_eq!(reports[0].local_box.origin(), [0.0, 0.0, 0.0]);
    assert_eq!(reports[0].local_box.local_length(), [5.0, 10.0, 10.0]);
    assert_eq!(reports[0].local_box.boundary(0), Some(1));
    assert_eq!(reports[0].local_box.boundary(1), Some(0));

    assert_eq!(reports[1].coordinate, [1, 0, 0]);
    assert_eq!(reports[1].local_box.origin(), [5.0, 0.0, 0.0]);
    assert_eq!(reports[1].local_box.local_length(), [5.0, 10.0, 10.0]);
    assert_eq!(reports[1].local_box.boundary(1), Some(-1));
}

#[test]
fn invalid_box_length_is_rejected_everywhere() {
    let reports = launch_reports(3, |system| {
        system.set_box_length([3.0, 3.0, 3.0]).unwrap();
        let err = system.set_box_length([3.0, -3.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry { .. }));
        assert_eq!(system.context().box_length(), [3.0, 3.0, 3.0]);
    });
    assert!(reports.iter().all(|r| r.box_length == [3.0, 3.0, 3.0]));
}

#[test]
fn mismatched_node_grid_is_rejected_everywhere() {
    let reports = launch_reports(7, |system| {
        let err = system.set_node_grid([2, 2, 2]).unwrap_err();
        assert_eq!(
            err,
            Error::TopologyMismatch {
                grid: [2, 2, 2],
                group_size: 7
            }
        );
    });
    assert!(reports.iter().all(|r| r.node_grid == [7, 1, 1]));
}

#[test]
fn no_member_runs_ahead_of_a_geometry_change() {
    let size = 4;
    let count = Arc::new(AtomicUsize::new(0));
    let shared = Arc::clone(&count);

    let results = ThreadGroup::launch(size, move |member| {
        let mut context = SimulationContext::new(member.group()).unwrap();
        context.observe(Box::new(GeometryCounter {
            count: Arc::clone(&shared),
        }));
        let mut system = StandAlone::start_with_context(member, context).unwrap();
        if system.is_head() {
            for step in 1..=5 {
                system.set_box_length([step as f64; 3]).unwrap();
                // every member applied the change before the head got here
                assert_eq!(shared.load(Ordering::SeqCst), step * size);
            }
            system.shutdown().unwrap();
        }
        system.context().box_length()
    })
    .unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 5 * size);
    assert!(results.iter().all(|length| *length == [5.0; 3]));
}

#[test]
fn repeated_commands_are_idempotent() {
    let reports = launch_reports(2, |system| {
        system.set_box_length([8.0, 8.0, 8.0]).unwrap();
        let first = system.context().local_box().clone();
        system.set_box_length([8.0, 8.0, 8.0]).unwrap();
        assert_eq!(system.context().local_box(), &first);

        system.set_node_grid([1, 2, 1]).unwrap();
        let topology = system.context().topology().clone();
        system.set_node_grid([1, 2, 1]).unwrap();
        assert_eq!(system.context().topology(), &topology);
    });
    assert_eq!(reports[1].coordinate, [0, 1, 0]);
    assert_eq!(reports[1].local_box.origin(), [0.0, 4.0, 0.0]);
}

#[test]
fn worker_setters_are_no_ops() {
    let results = ThreadGroup::launch(2, |member| {
        let mut system = StandAlone::start(member).unwrap();
        if system.is_head() {
            system.set_box_length([2.0, 2.0, 2.0]).unwrap();
            system.shutdown().unwrap();
            None
        } else {
            // the dispatch loop already returned; this must not touch state
            system.set_box_length([9.0, 9.0, 9.0]).unwrap();
            system.set_node_grid([1, 1, 1]).unwrap();
            Some((system.context().box_length(), system.context().node_grid()))
        }
    })
    .unwrap();
    assert_eq!(results[1], Some(([2.0; 3], [2, 1, 1])));
}

#[test]
fn dropping_the_head_releases_workers() {
    let results = ThreadGroup::launch(3, |member| {
        let system = StandAlone::start(member).unwrap();
        let rank = system.transport().rank();
        drop(system);
        rank
    })
    .unwrap();
    assert_eq!(results, vec![0, 1, 2]);
}

#[test]
fn head_failing_mid_command_still_releases_workers() {
    let applied = Arc::new(AtomicUsize::new(0));
    let shared = Arc::clone(&applied);

    let result = ThreadGroup::launch(3, move |member| {
        let mut context = SimulationContext::new(member.group()).unwrap();
        if member.group().is_head() {
            context.observe(Box::new(FailingObserver));
        } else {
            context.observe(Box::new(GeometryCounter {
                count: Arc::clone(&shared),
            }));
        }
        let mut system = StandAlone::start_with_context(member, context).unwrap();
        if system.is_head() {
            let _ = system.set_box_length([2.0, 2.0, 2.0]);
        }
        system.context().box_length()
    });

    // the head thread only finishes once both workers met its barriers
    assert!(matches!(result, Err(Error::Transport(_))));
    assert_eq!(applied.load(Ordering::SeqCst), 2);
}

#[test]
fn minimum_image_follows_physical_periodicity() {
    let results = ThreadGroup::launch(2, |member| {
        let mut system = StandAlone::start(member).unwrap();
        if system.is_head() {
            system.set_box_length([10.0, 10.0, 10.0]).unwrap();
            system.set_periodicity([false, true, true]).unwrap();
            system.shutdown().unwrap();
        }
        let ctx = system.context();
        (
            ctx.minimum_image_vector([1.0, 1.0, 1.0], [9.0, 1.0, 1.0]),
            ctx.minimum_image_vector([1.0, 1.0, 1.0], [1.0, 9.0, 1.0]),
            // rank adjacency still wraps even though x is not periodic
            ctx.neighbor_ranks(),
        )
    })
    .unwrap();

    for (open_axis, periodic_axis, neighbors) in &results {
        assert_eq!(*open_axis, [-8.0, 0.0, 0.0]);
        assert_eq!(*periodic_axis, [0.0, 2.0, 0.0]);
        assert_eq!(neighbors[0], neighbors[1]);
    }
    assert_eq!(results[0].2[0], 1);
    assert_eq!(results[1].2[0], 0);
}
