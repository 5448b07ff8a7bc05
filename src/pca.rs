// Principal component analysis (PCA)

use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use ndarray_linalg::{Eigh, UPLO};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{PcaError, Result};

/// Threshold below which a vector norm is treated as zero.
const NORMALIZATION_THRESHOLD: f64 = 1e-9;

/// Principal component analysis (PCA) structure.
///
/// This struct holds the results of a fit (mean, rotation matrix, and
/// retained eigenvalues) and maps data between the original coordinate space
/// and the principal component space. The fit is exact: it eigendecomposes
/// the unbiased sample covariance matrix of the input. Models can also be
/// loaded from/saved to files.
///
/// Eigenvectors are determined only up to sign, and within a degenerate
/// eigenspace (repeated eigenvalues) only up to rotation. No canonical
/// orientation is imposed, so two mathematically equivalent models may
/// differ by column signs.
#[derive(Serialize, Deserialize, Debug)]
pub struct PCA {
    /// The rotation matrix (principal components as columns).
    /// Shape: (n_features, k_components)
    rotation: Option<Array2<f64>>,
    /// Mean vector of the original training data.
    /// Shape: (n_features)
    mean: Option<Array1<f64>>,
    /// Eigenvalues of the covariance matrix for the retained components,
    /// ordered from largest to smallest and clamped at zero.
    /// Shape: (k_components)
    explained_variance: Option<Array1<f64>>,
    /// Sum of all eigenvalues of the covariance matrix, retained or not.
    /// Denominator for [`PCA::explained_variance_ratio`].
    total_variance: Option<f64>,
}

impl Default for PCA {
    fn default() -> Self {
        Self::new()
    }
}

impl PCA {
    /// Creates a new, empty PCA struct.
    ///
    /// The model is not fitted and needs to be computed using [`PCA::fit`]
    /// or [`PCA::fit_transform`], or loaded using [`PCA::load_model`] or
    /// [`PCA::with_model`].
    ///
    /// # Examples
    ///
    /// ```
    /// use exact_pca::PCA;
    /// let pca = PCA::new();
    /// ```
    pub fn new() -> Self {
        Self {
            rotation: None,
            mean: None,
            explained_variance: None,
            total_variance: None,
        }
    }

    /// Creates a PCA instance from a pre-computed basis and mean.
    ///
    /// This is useful when the projection basis was computed externally, or
    /// to reconstruct data through [`PCA::inverse_transform`] given only a
    /// basis and a mean. Eigenvalues are not available on such a model, so
    /// [`PCA::explained_variance`] returns `None`.
    ///
    /// * `rotation` - Projection basis with unit-norm columns, shape
    ///   (n_features, k_components).
    /// * `mean` - Mean vector of the original data, shape (n_features).
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::Dimension`] if the feature dimensions of
    /// `rotation` and `mean` disagree, and [`PcaError::Numerical`] if either
    /// contains non-finite values.
    pub fn with_model(rotation: Array2<f64>, mean: Array1<f64>) -> Result<Self> {
        if rotation.nrows() != mean.len() {
            return Err(PcaError::Dimension(format!(
                "rotation matrix has {} feature rows but the mean vector has length {}",
                rotation.nrows(),
                mean.len()
            )));
        }
        if rotation.iter().any(|v| !v.is_finite()) || mean.iter().any(|v| !v.is_finite()) {
            return Err(PcaError::Numerical(
                "rotation matrix or mean vector contains non-finite values".to_string(),
            ));
        }

        Ok(Self {
            rotation: Some(rotation),
            mean: Some(mean),
            explained_variance: None,
            total_variance: None,
        })
    }

    /// Returns a reference to the mean vector of the training data, if set.
    ///
    /// The mean vector has dimensions (n_features).
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Returns a reference to the rotation matrix (principal components), if set.
    ///
    /// The rotation matrix has dimensions (n_features, k_components); each
    /// column is a unit-norm principal direction, ordered by descending
    /// eigenvalue.
    pub fn rotation(&self) -> Option<&Array2<f64>> {
        self.rotation.as_ref()
    }

    /// Returns a reference to the eigenvalues of the retained components.
    ///
    /// These are the eigenvalues of the covariance matrix of the training
    /// data, ordered from largest to smallest. `None` if the model has not
    /// been fitted, or was built by [`PCA::with_model`].
    pub fn explained_variance(&self) -> Option<&Array1<f64>> {
        self.explained_variance.as_ref()
    }

    /// Returns the fraction of total variance captured by each retained
    /// component.
    ///
    /// The denominator is the sum over all eigenvalues of the covariance
    /// matrix, including the ones that were not retained. For data whose
    /// variance is entirely concentrated on the retained components, the
    /// entries sum to 1.
    pub fn explained_variance_ratio(&self) -> Option<Array1<f64>> {
        match (self.explained_variance.as_ref(), self.total_variance) {
            (Some(variances), Some(total)) if total > 0.0 => Some(variances / total),
            (Some(variances), Some(_)) => Some(Array1::zeros(variances.len())),
            _ => None,
        }
    }

    /// Fits the PCA model to the data.
    ///
    /// The pipeline is the exact covariance approach, each step a pure
    /// function of the previous result: compute the per-column mean and
    /// center the data; form the unbiased covariance matrix
    /// (`n_samples - 1` denominator); eigendecompose it; sort the eigenpairs
    /// by descending eigenvalue (stable, so ties keep their order); keep the
    /// first `n_components` eigenvectors as the projection basis.
    ///
    /// * `data_matrix` - Input data as a 2D array, shape
    ///   (n_samples, n_features). Consumed; centering happens in place.
    /// * `n_components` - Number of principal components to retain, in
    ///   `1..=n_features`.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::InsufficientSamples`] for fewer than 2 rows,
    /// [`PcaError::Dimension`] if `n_components` is outside `1..=n_features`
    /// (or the matrix has no feature columns), and [`PcaError::Numerical`]
    /// if the eigendecomposition fails or yields non-finite eigenvalues.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use exact_pca::PCA;
    ///
    /// let data = array![
    ///     [1.0, 2.0],
    ///     [3.0, 4.0],
    ///     [5.0, 6.0],
    /// ];
    ///
    /// let mut pca = PCA::new();
    /// pca.fit(data, 2).unwrap();
    /// ```
    pub fn fit(&mut self, data_matrix: Array2<f64>, n_components: usize) -> Result<()> {
        self.fit_scores(data_matrix, n_components)?;
        Ok(())
    }

    /// Fits the PCA model and returns the principal component scores of the
    /// training data.
    ///
    /// Equivalent to [`PCA::fit`] followed by [`PCA::transform`] on the same
    /// input, but projects the already-centered data directly instead of
    /// centering twice.
    ///
    /// # Errors
    ///
    /// Same conditions as [`PCA::fit`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use exact_pca::PCA;
    ///
    /// let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]];
    /// let mut pca = PCA::new();
    /// let scores = pca.fit_transform(data, 1).unwrap();
    /// assert_eq!(scores.dim(), (4, 1));
    /// ```
    pub fn fit_transform(
        &mut self,
        data_matrix: Array2<f64>,
        n_components: usize,
    ) -> Result<Array2<f64>> {
        self.fit_scores(data_matrix, n_components)
    }

    fn fit_scores(
        &mut self,
        mut data_matrix: Array2<f64>,
        n_components: usize,
    ) -> Result<Array2<f64>> {
        let n_samples = data_matrix.nrows();
        let n_features = data_matrix.ncols();

        if n_samples < 2 {
            return Err(PcaError::InsufficientSamples { got: n_samples });
        }
        if n_features == 0 {
            return Err(PcaError::Dimension(
                "input matrix has zero feature columns".to_string(),
            ));
        }
        if n_components < 1 || n_components > n_features {
            return Err(PcaError::Dimension(format!(
                "requested {} components, but the valid range for {} features is 1..={}",
                n_components, n_features, n_features
            )));
        }

        debug!(
            "fitting exact PCA: {} samples x {} features, retaining {} components",
            n_samples, n_features, n_components
        );

        let mean_vector = data_matrix
            .mean_axis(Axis(0))
            .ok_or_else(|| PcaError::Numerical("failed to compute column means".to_string()))?;
        data_matrix -= &mean_vector;

        // data_matrix is centered from here on.
        let mut cov_matrix = data_matrix.t().dot(&data_matrix);
        cov_matrix /= (n_samples - 1) as f64;

        // The covariance is symmetric by construction; eigh reads a single
        // triangle, so floating-point asymmetry in the stored matrix cannot
        // perturb the decomposition.
        let (eigenvalues, eigenvectors) = cov_matrix.eigh(UPLO::Upper).map_err(|e| {
            PcaError::Numerical(format!(
                "eigendecomposition of covariance matrix failed: {}",
                e
            ))
        })?;
        if eigenvalues.iter().any(|v| !v.is_finite()) {
            return Err(PcaError::Numerical(
                "eigendecomposition produced non-finite eigenvalues".to_string(),
            ));
        }

        // Stable sort on the eigenvalue alone; ties keep the solver's order.
        let mut eig_pairs: Vec<(f64, Array1<f64>)> = eigenvalues
            .into_iter()
            .zip(eigenvectors.columns().into_iter().map(|col| col.to_owned()))
            .collect();
        eig_pairs.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        // Tiny negative eigenvalues are rounding artifacts of a PSD matrix.
        let total_variance: f64 = eig_pairs.iter().map(|(val, _)| val.max(0.0)).sum();

        let mut sorted_eigenvalues: Vec<f64> = Vec::with_capacity(n_components);
        let mut top_eigvecs: Vec<Array1<f64>> = Vec::with_capacity(n_components);
        for (eig_val, mut eig_vec) in eig_pairs.into_iter().take(n_components) {
            sorted_eigenvalues.push(eig_val.max(0.0));
            let norm = eig_vec.dot(&eig_vec).sqrt();
            if norm > NORMALIZATION_THRESHOLD {
                eig_vec.mapv_inplace(|x| x / norm);
            } else {
                eig_vec.fill(0.0);
            }
            top_eigvecs.push(eig_vec);
        }
        trace!("retained eigenvalues: {:?}", sorted_eigenvalues);

        let views: Vec<ArrayView1<f64>> = top_eigvecs.iter().map(|v| v.view()).collect();
        let rotation_matrix = ndarray::stack(Axis(1), &views).map_err(|e| {
            PcaError::Numerical(format!("failed to assemble rotation matrix: {}", e))
        })?;

        let scores = data_matrix.dot(&rotation_matrix);

        self.rotation = Some(rotation_matrix);
        self.mean = Some(mean_vector);
        self.explained_variance = Some(Array1::from(sorted_eigenvalues));
        self.total_variance = Some(total_variance);

        Ok(scores)
    }

    /// Applies the PCA transformation to the given data.
    ///
    /// The data is centered using the mean learned during fitting and
    /// projected onto the principal components.
    ///
    /// * `x` - Input data to transform, shape (m_samples, n_features). Can
    ///   be a single sample (1 row) or multiple samples. Consumed; centering
    ///   happens in place.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::NotFitted`] if the model has no rotation or mean,
    /// and [`PcaError::Dimension`] if the feature count of `x` differs from
    /// the model's.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use exact_pca::PCA;
    ///
    /// let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
    /// let mut pca = PCA::new();
    /// pca.fit(data.clone(), 2).unwrap();
    /// let scores = pca.transform(data).unwrap();
    /// assert_eq!(scores.dim(), (3, 2));
    /// ```
    pub fn transform(&self, x: Array2<f64>) -> Result<Array2<f64>> {
        let rotation_matrix = self.rotation.as_ref().ok_or(PcaError::NotFitted)?;
        let centered = self.center(x)?;
        Ok(centered.dot(rotation_matrix))
    }

    /// Subtracts the fitted mean from each row of `x` and returns the
    /// centered matrix.
    ///
    /// The column-wise mean of the result is numerically zero when `x` is
    /// the training data. This is the centered view an external plotting or
    /// reporting layer needs alongside [`PCA::mean`], [`PCA::rotation`], and
    /// [`PCA::inverse_transform`].
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::NotFitted`] if no mean has been computed, and
    /// [`PcaError::Dimension`] on a feature-count mismatch.
    pub fn center(&self, mut x: Array2<f64>) -> Result<Array2<f64>> {
        let mean_vector = self.mean.as_ref().ok_or(PcaError::NotFitted)?;
        if x.ncols() != mean_vector.len() {
            return Err(PcaError::Dimension(format!(
                "input has {} feature columns, but the model was fitted on {}",
                x.ncols(),
                mean_vector.len()
            )));
        }
        x -= mean_vector;
        Ok(x)
    }

    /// Maps principal component scores back into the original coordinate
    /// space.
    ///
    /// Computes `scores · rotationᵀ + mean`. When all components were
    /// retained (`k = n_features`) this reconstructs the original data up to
    /// floating-point tolerance; with fewer components the result is the
    /// best rank-k approximation of the input in the least-squares sense.
    ///
    /// * `scores` - Projected data, shape (m_samples, k_components).
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::NotFitted`] if the model has no rotation or mean,
    /// and [`PcaError::Dimension`] if the column count of `scores` differs
    /// from the number of retained components.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use exact_pca::PCA;
    ///
    /// let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]];
    /// let mut pca = PCA::new();
    /// let scores = pca.fit_transform(data.clone(), 2).unwrap();
    /// let reconstructed = pca.inverse_transform(scores).unwrap();
    /// assert!((&reconstructed - &data).iter().all(|d| d.abs() < 1e-9));
    /// ```
    pub fn inverse_transform(&self, scores: Array2<f64>) -> Result<Array2<f64>> {
        let rotation_matrix = self.rotation.as_ref().ok_or(PcaError::NotFitted)?;
        let mean_vector = self.mean.as_ref().ok_or(PcaError::NotFitted)?;

        if scores.ncols() != rotation_matrix.ncols() {
            return Err(PcaError::Dimension(format!(
                "projection has {} columns, but the model retains {} components",
                scores.ncols(),
                rotation_matrix.ncols()
            )));
        }

        let mut reconstructed = scores.dot(&rotation_matrix.t());
        reconstructed += mean_vector;
        Ok(reconstructed)
    }

    /// Saves the current PCA model to a file using bincode.
    ///
    /// The model must contain a rotation matrix and a mean vector. The
    /// eigenvalues can be absent (e.g., if the model was created via
    /// [`PCA::with_model`]).
    ///
    /// * `path` - The file path to save the model to.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::NotFitted`] on an unfitted model,
    /// [`PcaError::Io`] on file errors, and [`PcaError::Serialization`] if
    /// encoding fails.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if self.rotation.is_none() || self.mean.is_none() {
            return Err(PcaError::NotFitted);
        }
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);

        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| PcaError::Serialization(e.to_string()))?;
        Ok(())
    }

    /// Loads a PCA model from a file previously saved with
    /// [`PCA::save_model`].
    ///
    /// * `path` - The file path to load the model from.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::Io`] or [`PcaError::Serialization`] if reading or
    /// decoding fails, [`PcaError::NotFitted`] if the stored model is
    /// missing its rotation or mean, [`PcaError::Dimension`] on inconsistent
    /// dimensions, and [`PcaError::Numerical`] if the stored eigenvalues are
    /// non-finite or negative.
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);

        let pca_model: PCA =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
                .map_err(|e| PcaError::Serialization(e.to_string()))?;

        let rotation_matrix = pca_model.rotation.as_ref().ok_or(PcaError::NotFitted)?;
        let mean_vector = pca_model.mean.as_ref().ok_or(PcaError::NotFitted)?;

        if rotation_matrix.nrows() != mean_vector.len() {
            return Err(PcaError::Dimension(format!(
                "loaded model is inconsistent: rotation has {} feature rows, mean has length {}",
                rotation_matrix.nrows(),
                mean_vector.len()
            )));
        }
        if let Some(variances) = pca_model.explained_variance.as_ref() {
            if variances.len() != rotation_matrix.ncols() {
                return Err(PcaError::Dimension(format!(
                    "loaded model is inconsistent: {} eigenvalues for {} components",
                    variances.len(),
                    rotation_matrix.ncols()
                )));
            }
            if variances.iter().any(|&v| !v.is_finite() || v < 0.0) {
                return Err(PcaError::Numerical(
                    "loaded model contains non-finite or negative eigenvalues".to_string(),
                ));
            }
        }
        if let Some(total) = pca_model.total_variance {
            if !total.is_finite() || total < 0.0 {
                return Err(PcaError::Numerical(
                    "loaded model has a non-finite or negative total variance".to_string(),
                ));
            }
        }

        Ok(pca_model)
    }
}
