use param_optimizer::prelude::*;
use tracing_subscriber::EnvFilter;

fn sum_of_squares(params: &Params) -> anyhow::Result<f64> {
    Ok(params.iter_values().map(|v| v * v).sum())
}

fn sum_of_squares_gradient(params: &Params) -> anyhow::Result<Vec<f64>> {
    Ok(params.iter_values().map(|v| 2.0 * v).collect())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let params = Params::from_values(&[1.0, 2.5, -1.0]);
    println!("Start:\n{params}");

    let (res, final_params) =
        minimize_with_gradient(sum_of_squares, sum_of_squares_gradient, &params, "lbfgs")?;
    println!("{res}\n");
    println!("Final:\n{final_params}");

    // Same problem, bounded, derivative-free, with a Hessian at the optimum.
    let bounded = Params::new(vec![
        Param::new("a", 1.0).with_bounds(0.5, 2.0),
        Param::new("b", 2.5),
        Param::new("c", -1.0).with_upper_bound(0.0),
    ]);
    let (res, final_params) = Minimize::new(sum_of_squares, &bounded, "nelder_mead")?
        .with_options(OptimizeOptions::default().with_final_hessian(true))
        .run()?;
    println!("{res}\n");
    println!("Final:\n{final_params}");

    Ok(())
}
