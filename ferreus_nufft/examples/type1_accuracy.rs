use ferreus_nufft::{
    Options, Plan, direct_type1, generate_random_points, generate_random_strengths,
    progress::{ProgressMsg, closure_sink},
    relative_error,
    config::CoordinateConvention,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Random points in [-pi, pi)^3 with random complex strengths
    let num_points = 20_000usize;
    let modes = [32usize, 32, 32];
    let points = generate_random_points(num_points, modes.len(), Some(42));
    let strengths = generate_random_strengths(num_points, Some(43));

    // Print plan and stage events as they arrive
    let (sink, listener) = closure_sink(256, |msg| match msg {
        ProgressMsg::PlanCreated {
            fine_grid_sizes,
            nspread,
            ..
        } => println!("Fine grid {:?}, kernel width {}", fine_grid_sizes, nspread),
        ProgressMsg::PointsBound {
            num_bins,
            num_subproblems,
            elapsed,
            ..
        } => println!(
            "Sorted into {} bins and {} subproblems in {:?}",
            num_bins, num_subproblems, elapsed
        ),
        ProgressMsg::StageCompleted { stage, elapsed, .. } => {
            println!("{:?} took {:?}", stage, elapsed)
        }
        ProgressMsg::Message { message } => println!("{}", message),
    });

    for tolerance in [1e-3, 1e-6, 1e-9] {
        let options = Options::from_tolerance(tolerance, 2.0)?;
        let mut plan = Plan::builder(num_points, &modes, options)
            .progress_callback(sink.clone())
            .build()?;
        plan.set_points(&points)?;
        let fk = plan.execute_type1(&strengths)?;

        // Check a subset of the points against direct summation to keep the example quick
        let sample = 2_000usize;
        let sample_points = points.as_ref().subrows(0, sample).to_owned();
        let exact = direct_type1(
            &sample_points,
            &strengths[..sample],
            &modes,
            1,
            CoordinateConvention::MinusPiToPi,
            plan.fine_grid_sizes(),
        );
        let mut partial = Plan::new(sample, &modes, 1, 0, 1, options)?;
        partial.set_points(&sample_points)?;
        let approx = partial.execute_type1(&strengths[..sample])?;

        println!(
            "tolerance {:e}: {} modes, relative error {:e}",
            tolerance,
            fk.len(),
            relative_error(&approx, &exact)
        );
    }

    drop(sink);
    let _ = listener.join();

    Ok(())
}
