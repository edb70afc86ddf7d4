mod param_scaling;
