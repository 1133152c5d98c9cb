use crate::math::matrix::MatrixHelper;

/// Detrended line and whether the fit had to be skipped.
#[derive(Debug, Clone)]
pub struct TrendOutcome {
    pub values: Vec<f64>,
    pub poor_fit: bool,
}

/// Fits a polynomial through the unmarked samples and subtracts it from
/// every sample. With fewer than `min_samples` usable unmarked samples the
/// line is returned unchanged and `poor_fit` is raised.
pub fn remove_trend(
    values: &[f64],
    x: &[f64],
    marks: &[bool],
    degree: usize,
    min_samples: usize,
) -> TrendOutcome {
    let (fit_x, fit_y): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(values)
        .zip(marks)
        .filter(|((xi, yi), marked)| !**marked && xi.is_finite() && yi.is_finite())
        .map(|((&xi, &yi), _)| (xi, yi))
        .unzip();

    let unchanged = || TrendOutcome {
        values: values.to_vec(),
        poor_fit: true,
    };

    if fit_x.len() < min_samples {
        return unchanged();
    }
    let Some(fit) = MatrixHelper::polyfit(&fit_x, &fit_y, degree) else {
        return unchanged();
    };

    TrendOutcome {
        values: values
            .iter()
            .zip(x)
            .map(|(&value, &xi)| value - fit.eval(xi))
            .collect(),
        poor_fit: false,
    }
}
