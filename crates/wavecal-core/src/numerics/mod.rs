pub mod polyfit;
pub mod vector;

pub use polyfit::{fit_polynomial, polynomial_value_at, PolyfitError};
pub use vector::{
    average, generate_linear_grid, max_value, min_value, normalize, remove_mean, stdev, sum,
    sum_of_squared_differences, value_at_fractional_index, variance, VectorError,
};
